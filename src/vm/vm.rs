use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::class_parser::{parse_class, ParseError};
use crate::class_parser::types::JavaClass;
use crate::vm::thread::ExecError;
use crate::vm::thread::thread::{ThreadStatus, VMThread};
use crate::vm::value::Value;

/// Registry of loaded classes keyed by their internal name (`java/lang/Object`).
///
/// A class name is registered at most once per VM: the first successful load wins
/// and later loads of the same name are discarded. Registered classes are never
/// mutated, so they are handed out as shared `Arc`s.
pub struct JavaVirtualMachine {
    classes: Mutex<HashMap<String, Arc<JavaClass>>>,
}

impl Default for JavaVirtualMachine {
    fn default() -> Self {
        Self::init()
    }
}

impl JavaVirtualMachine {
    pub fn init() -> JavaVirtualMachine {
        JavaVirtualMachine {
            classes: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the lock can't leave the map half-updated
    fn classes(&self) -> MutexGuard<'_, HashMap<String, Arc<JavaClass>>> {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parses `bytes` and registers the class. Returns the registered entry, which is
    /// the previously loaded class if one with the same name already exists.
    pub fn load_class(&self, bytes: &[u8]) -> Result<Arc<JavaClass>, ParseError> {
        // Parsing is independent per class file, only registration is serialized
        let class = parse_class(bytes)?;
        Ok(self.register(class).0)
    }

    /// Registers `class` unless its name is taken. The flag is true if this call added it.
    pub(crate) fn register(&self, class: JavaClass) -> (Arc<JavaClass>, bool) {
        let name = class.name();

        let mut classes = self.classes();
        if let Some(existing) = classes.get(&name) {
            log::warn!("class {} is already loaded, discarding the new definition", name);
            return (existing.clone(), false);
        }

        log::debug!("registered class {}", name);
        let class = Arc::new(class);
        classes.insert(name, class.clone());
        (class, true)
    }

    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.classes().contains_key(name)
    }

    pub fn get_class(&self, name: &str) -> Option<Arc<JavaClass>> {
        self.classes().get(name).cloned()
    }

    pub fn loaded_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs `class_name.method_name descriptor` with `locals` as its initial local
    /// variables (including `this` for instance methods) on a fresh thread of control.
    pub fn execute(&self, class_name: &str, method_name: &str, descriptor: &str, locals: &[Value])
        -> Result<Option<Value>, ExecError> {
        let class = self.get_class(class_name)
            .ok_or_else(|| ExecError::ClassNotLoaded(class_name.to_string()))?;

        let method = class.get_method(method_name, descriptor)
            .ok_or_else(|| ExecError::MethodNotFound {
                class: class_name.to_string(),
                name: method_name.to_string(),
                descriptor: descriptor.to_string(),
            })?;

        let mut thread = VMThread::new();
        thread.start(&class, method, locals);

        match thread.status {
            ThreadStatus::FINISHED(value) => Ok(value),
            ThreadStatus::FAILED(e) => Err(e),
            ThreadStatus::STOPPED | ThreadStatus::RUNNING => Ok(None),
        }
    }

    /// Runs `public static void main(String[])`. The argument array is passed as null.
    pub fn execute_main(&self, class_name: &str) -> Result<(), ExecError> {
        self.execute(class_name, "main", "([Ljava/lang/String;)V", &[Value::NULL])?;
        Ok(())
    }
}
