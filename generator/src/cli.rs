use std::path::PathBuf;

use clap::Parser;

use xsdgen::Generator;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[arg(help = "The source file, URL, or - for standard input")]
    pub input: String,

    #[arg(short, long, help = "Write the generated code here instead of standard output")]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, help = "Target language [default: rust]")]
    pub generator: Option<Generator>,

    #[arg(long, help = "Prefix of the XML Schema namespace, overriding the one declared")]
    pub namespace_prefix: Option<String>,

    #[arg(long, help = "TOML file with name mappings, accessor style and user methods")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Name accessors getVar()/setVar() instead of get_var()/set_var()")]
    pub use_old_getter_setter: bool,

    #[arg(short, long, help = "Overwrite the output file if it exists")]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "generator-typescript")]
    fn parses_all_options() {
        let cli = Cli::try_parse_from([
            "xsdgen",
            "schema.xsd",
            "-o",
            "out.ts",
            "-g",
            "typescript",
            "--namespace-prefix",
            "xsd",
            "--use-old-getter-setter",
            "-f",
        ])
        .unwrap();
        assert_eq!(cli.input, "schema.xsd");
        assert_eq!(cli.output, Some(PathBuf::from("out.ts")));
        assert_eq!(cli.generator, Some(Generator::Typescript));
        assert_eq!(cli.namespace_prefix.as_deref(), Some("xsd"));
        assert!(cli.use_old_getter_setter);
        assert!(cli.force);
        assert!(cli.config.is_none());
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["xsdgen"]).is_err());
    }
}
