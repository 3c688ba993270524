use std::{
    collections::HashMap,
    io::{self, Write},
};

use once_cell::sync::Lazy;
use regex::Regex;

/// Markers look like `/*{ key }*/` so that template sources stay valid
/// in the emitted language.
static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*\{(.*?)\}\*/").unwrap());

/// A source template with substitution markers.
pub struct Template<'src> {
    source: &'src str,
}

impl<'src> Template<'src> {
    pub fn new(source: &'src str) -> Self {
        Template { source }
    }

    pub fn writer<'writer>(&self) -> TemplateWriter<'writer, 'src> {
        TemplateWriter {
            template: self.source,
            substitutions: HashMap::new(),
        }
    }
}

/// Collects the substitutions for one rendering pass. Substitutions are
/// writer closures, so large tables stream straight into the output
/// without intermediate strings.
pub struct TemplateWriter<'writer, 'template> {
    template: &'template str,
    substitutions:
        HashMap<&'static str, Box<dyn Fn(&mut dyn Write) -> io::Result<()> + 'writer>>,
}

impl<'writer, 'template> TemplateWriter<'writer, 'template> {
    pub fn substitute<F>(&mut self, key: &'static str, writer: F)
    where
        F: Fn(&mut dyn Write) -> io::Result<()> + 'writer,
    {
        self.substitutions.insert(key, Box::new(writer));
    }

    pub fn substitute_text(&mut self, key: &'static str, text: String) {
        self.substitute(key, move |out| write!(out, "{}", text));
    }

    /// Render the template. A marker without a registered substitution
    /// is a generator bug and panics.
    pub fn write(&self, output: &mut dyn Write) -> io::Result<()> {
        let mut last = 0;
        for captures in MARKER.captures_iter(self.template) {
            let marker = captures.get(0).unwrap();
            let key = captures.get(1).unwrap().as_str().trim();
            output.write_all(self.template[last..marker.start()].as_bytes())?;
            let substitution = self.substitutions.get(key).unwrap_or_else(|| {
                panic!("no substitution supplied for template key '{}'", key)
            });
            substitution(output)?;
            last = marker.end();
        }
        output.write_all(self.template[last..].as_bytes())
    }
}
