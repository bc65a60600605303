use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use crate::class_parser::{parse_class, ParseError};
use crate::class_parser::types::JavaClass;
use crate::vm::thread::ExecError;
use crate::vm::thread::thread::VMThread;
use crate::vm::vm::JavaVirtualMachine;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("could not read class {class}: {source}")]
    Io { class: String, source: io::Error },
    #[error("class file for {expected} defines {found}")]
    NameMismatch { expected: String, found: String },
    #[error("class {0} is its own superclass or superinterface")]
    ClassCircularity(String),
    #[error("initialization of {class} failed: {source}")]
    Initialization { class: String, source: ExecError },
}

/// Where class files come from, by internal class name.
pub trait ClassSource {
    fn read_class(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Class path rooted at a directory: `a/b/C` is read from `<root>/a/b/C.class`.
pub struct DirectoryClassSource {
    root: PathBuf,
}

impl DirectoryClassSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryClassSource { root: root.into() }
    }

    pub fn class_file_path(&self, name: &str) -> PathBuf {
        self.root.join(name.replace('.', "/") + ".class")
    }
}

impl ClassSource for DirectoryClassSource {
    fn read_class(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.class_file_path(name))
    }
}

impl JavaVirtualMachine {
    /// Returns the class named `name`, loading it and its supertypes from `source` and
    /// running its static initializer if it isn't registered yet.
    pub fn resolve_class(&self, name: &str, source: &dyn ClassSource) -> Result<Option<Arc<JavaClass>>, LoadError> {
        let mut in_progress = vec![];
        self.resolve_with(name, source, &mut in_progress)
    }

    fn resolve_with(&self, name: &str, source: &dyn ClassSource, in_progress: &mut Vec<String>)
        -> Result<Option<Arc<JavaClass>>, LoadError> {
        if let Some(class) = self.get_class(name) {
            return Ok(Some(class));
        }

        if in_progress.iter().any(|n| n == name) {
            return Err(LoadError::ClassCircularity(name.to_string()));
        }

        let bytes = match source.read_class(name) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound && name.starts_with("java/") => {
                log::debug!("{} is not on the class path, assuming it is provided by the host", name);
                return Ok(None);
            }
            Err(err) => return Err(LoadError::Io { class: name.to_string(), source: err }),
        };

        let class = parse_class(&bytes)?;
        let found = class.name();
        if found != name {
            return Err(LoadError::NameMismatch { expected: name.to_string(), found });
        }

        self.link(class, source, in_progress).map(Some)
    }

    /// Parses `bytes` and loads the class they define, taking its supertypes from `source`.
    /// Returns the registered class if one of the same name was loaded before.
    pub fn define_class(&self, bytes: &[u8], source: &dyn ClassSource) -> Result<Arc<JavaClass>, LoadError> {
        let class = parse_class(bytes)?;
        if let Some(loaded) = self.get_class(&class.name()) {
            return Ok(loaded);
        }

        self.link(class, source, &mut vec![])
    }

    fn link(&self, class: JavaClass, source: &dyn ClassSource, in_progress: &mut Vec<String>)
        -> Result<Arc<JavaClass>, LoadError> {
        let name = class.name();
        log::debug!("resolving supertypes of {}", name);
        in_progress.push(name);
        let supertypes = class.super_class_name().into_iter().chain(class.interface_names());
        for supertype in supertypes {
            self.resolve_with(&supertype, source, in_progress)?;
        }
        in_progress.pop();

        let (class, added) = self.register(class);
        if added {
            self.initialize(&class)?;
        }

        Ok(class)
    }

    fn initialize(&self, class: &JavaClass) -> Result<(), LoadError> {
        let clinit = match class.get_method("<clinit>", "()V") {
            Some(method) if method.is_static() => method,
            _ => return Ok(()),
        };

        log::debug!("initializing {}", class.name());
        VMThread::new().run(class, clinit, &[])
            .map_err(|source| LoadError::Initialization { class: class.name(), source })?;

        Ok(())
    }
}
