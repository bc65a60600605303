mod common;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use common::*;
use rust_jvm_lite::{ClassSource, DirectoryClassSource, ExecError, JavaVirtualMachine, LoadError, ParseErrorType};

#[derive(Default)]
struct MemorySource {
    classes: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    fn with(mut self, name: &str, builder: ClassBuilder) -> Self {
        self.classes.insert(name.to_string(), builder.build());
        self
    }
}

impl ClassSource for MemorySource {
    fn read_class(&self, name: &str) -> io::Result<Vec<u8>> {
        self.classes.get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}

fn interface(name: &str) -> ClassBuilder {
    let mut builder = ClassBuilder::new(name);
    builder.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
    builder
}

#[test]
fn resolves_supertypes() {
    let mut main = ClassBuilder::with_super("app/Main", Some("app/Base"));
    main.interface("app/Greeter");
    main.interface("java/lang/Runnable");

    let source = MemorySource::default()
        .with("app/Main", main)
        .with("app/Base", ClassBuilder::new("app/Base"))
        .with("app/Greeter", interface("app/Greeter"));

    let vm = JavaVirtualMachine::init();
    let class = vm.resolve_class("app/Main", &source).unwrap().unwrap();
    assert_eq!(class.name(), "app/Main");
    assert_eq!(vm.loaded_class_names(), vec!["app/Base", "app/Greeter", "app/Main"]);

    // Already registered classes are not read again
    let class = vm.resolve_class("app/Base", &MemorySource::default()).unwrap().unwrap();
    assert_eq!(class.name(), "app/Base");
}

#[test]
fn defines_class_from_bytes() {
    let mut main = ClassBuilder::with_super("app/Main", Some("app/Base"));
    main.method(ACC_STATIC, "<clinit>", "()V", 1, 0, &[0x01, 0x57, 0xB1]);
    let bytes = main.build();
    let source = MemorySource::default().with("app/Base", ClassBuilder::new("app/Base"));

    let vm = JavaVirtualMachine::init();
    let class = vm.define_class(&bytes, &source).unwrap();
    assert_eq!(class.name(), "app/Main");
    assert_eq!(vm.loaded_class_names(), vec!["app/Base", "app/Main"]);

    let again = vm.define_class(&bytes, &MemorySource::default()).unwrap();
    assert!(Arc::ptr_eq(&class, &again));

    let cycle = MemorySource::default().with("B", ClassBuilder::with_super("B", Some("A")));
    let err = vm.define_class(&ClassBuilder::with_super("A", Some("B")).build(), &cycle).unwrap_err();
    assert!(matches!(err, LoadError::ClassCircularity(name) if name == "A"));
    assert!(!vm.is_class_loaded("A"));

    assert!(matches!(vm.define_class(&[0xCA, 0xFE], &source), Err(LoadError::Parse(_))));
}

#[test]
fn runs_static_initializer_once() {
    let mut main = ClassBuilder::new("Main");
    main.method(ACC_STATIC, "<clinit>", "()V", 1, 0, &[0x01, 0x57, 0xB1]);
    let source = MemorySource::default().with("Main", main);

    let vm = JavaVirtualMachine::init();
    assert!(vm.resolve_class("Main", &source).unwrap().is_some());
    assert!(vm.resolve_class("Main", &source).unwrap().is_some());
    assert!(vm.is_class_loaded("Main"));
}

#[test]
fn failing_static_initializer() {
    let mut main = ClassBuilder::new("Main");
    main.method(ACC_STATIC, "<clinit>", "()V", 2, 0, &[0x60, 0xB1]);
    let source = MemorySource::default().with("Main", main);

    let vm = JavaVirtualMachine::init();
    match vm.resolve_class("Main", &source) {
        Err(LoadError::Initialization { class, source }) => {
            assert_eq!(class, "Main");
            assert!(matches!(source, ExecError::OperandStackViolation { .. }));
        }
        other => panic!("unexpected result {:?}", other.map(|c| c.map(|c| c.name()))),
    }
    assert!(vm.is_class_loaded("Main"));
}

#[test]
fn circular_superclasses() {
    let source = MemorySource::default()
        .with("A", ClassBuilder::with_super("A", Some("B")))
        .with("B", ClassBuilder::with_super("B", Some("A")));

    let vm = JavaVirtualMachine::init();
    assert!(matches!(vm.resolve_class("A", &source), Err(LoadError::ClassCircularity(name)) if name == "A"));
    assert!(vm.loaded_class_names().is_empty());
}

#[test]
fn load_failures() {
    let vm = JavaVirtualMachine::init();

    let source = MemorySource::default().with("Main", ClassBuilder::new("Other"));
    assert!(matches!(vm.resolve_class("Main", &source),
                     Err(LoadError::NameMismatch { expected, found }) if expected == "Main" && found == "Other"));

    let source = MemorySource::default().with("Main", ClassBuilder::with_super("Main", Some("Missing")));
    assert!(matches!(vm.resolve_class("Main", &source), Err(LoadError::Io { class, .. }) if class == "Missing"));

    let mut broken = ClassBuilder::new("Main");
    broken.access_flags = ACC_FINAL | ACC_ABSTRACT;
    let source = MemorySource::default().with("Main", broken);
    assert!(matches!(vm.resolve_class("Main", &source), Err(LoadError::Parse(e)) if e.kind == ParseErrorType::InvalidAccessFlags));

    assert!(vm.loaded_class_names().is_empty());
}

#[test]
fn directory_class_path() {
    let root = std::env::temp_dir().join(format!("rust-jvm-lite-classes-{}", std::process::id()));
    std::fs::create_dir_all(root.join("app")).unwrap();
    std::fs::write(root.join("app/Main.class"), ClassBuilder::new("app/Main").build()).unwrap();

    let vm = JavaVirtualMachine::init();
    let class = vm.resolve_class("app/Main", &DirectoryClassSource::new(&root)).unwrap();
    assert_eq!(class.map(|c| c.name()).as_deref(), Some("app/Main"));

    std::fs::remove_dir_all(&root).unwrap();
}
