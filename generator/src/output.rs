use std::io;
use std::path::Path;

/// Writes generated code to `path`, refusing to replace an existing file
/// unless `force` is set.
pub fn write_output(path: &Path, code: &str, force: bool) -> io::Result<()> {
    if !force && path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists; pass --force to overwrite it", path.display()),
        ));
    }
    std::fs::write(path, code)
}
