use std::{
    collections::HashMap,
    io::{self, Write},
    path::{Path, PathBuf},
};

mod templating;

pub use templating::{Template, TemplateWriter};

/// Emitted source files, keyed by their relative output path.
pub struct GeneratedCode {
    code: HashMap<PathBuf, String>,
}

impl GeneratedCode {
    pub fn new() -> Self {
        GeneratedCode {
            code: HashMap::new(),
        }
    }

    /// Run `generator` against an in-memory buffer and store the result
    /// under `path`. A path may be written only once.
    pub fn add<G>(&mut self, path: &Path, generator: G) -> io::Result<()>
    where
        G: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let path = path.to_path_buf();
        if self.code.contains_key(&path) {
            return Err(io::Error::new(io::ErrorKind::Other, "duplicate path"));
        }
        let mut buffer = Vec::new();
        generator(&mut buffer)?;
        let text = String::from_utf8(buffer)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        self.code.insert(path, text);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.code.get(path).map(|text| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.code
            .iter()
            .map(|(path, text)| (path.as_path(), text.as_str()))
    }
}

impl Default for GeneratedCode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratedCode;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn test_generated_code_rejects_duplicate_paths() {
        let mut code = GeneratedCode::new();
        code.add(Path::new("parser.js"), |out| write!(out, "a"))
            .unwrap();
        assert!(code
            .add(Path::new("parser.js"), |out| write!(out, "b"))
            .is_err());
        assert_eq!(code.get(Path::new("parser.js")), Some("a"));
    }
}
