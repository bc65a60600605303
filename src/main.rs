use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rust_jvm_lite::{DirectoryClassSource, JavaClass, JavaVirtualMachine};

#[derive(Parser, Debug)]
#[clap(version, about = "Load, inspect and run Java class files")]
struct VmArgs {
    /// Class file to load
    class_file: PathBuf,

    /// Directory that supertypes are loaded from (default: the class file's directory)
    #[clap(long)]
    classpath: Option<PathBuf>,

    /// Print the parsed class with a listing of its code
    #[clap(short = 'c', long)]
    show: bool,

    /// Run `public static void main(String[])`
    #[clap(short, long)]
    execute: bool,
}

fn show(class: &JavaClass) {
    let kind = if class.is_interface() { "interface" } else { "class" };
    println!("{} {} ({:?})", kind, class.name(), class.access_flags);
    println!("  version {}.{}", class.major_version, class.minor_version);
    if let Some(super_class) = class.super_class_name() {
        println!("  extends {}", super_class);
    }
    for interface in class.interface_names() {
        println!("  implements {}", interface);
    }
    if let Some(source_file) = class.source_file() {
        println!("  source file {}", source_file);
    }

    for field in &class.fields {
        println!("  field {} {} ({:?})", class.field_name(field), field.descriptor, field.access_flags);
    }

    for method in &class.methods {
        let descriptor = class.constant_pool.get_string(method.descriptor_index).unwrap_or_default();
        println!("  method {}{} ({:?})", class.method_name(method), descriptor, method.access_flags);

        if let Some(code) = method.code() {
            println!("    max_stack={} max_locals={}", code.max_stack, code.max_locals);
            for line in code.disassemble() {
                println!("    {}", line);
            }
        }
    }
}

fn main() {
    env_logger::init();
    let args = VmArgs::parse();

    let bytes = match fs::read(&args.class_file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Could not read {}: {}", args.class_file.display(), e);
            process::exit(1);
        }
    };

    let class_path = args.classpath.clone()
        .or_else(|| args.class_file.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let vm = JavaVirtualMachine::init();
    let class = match vm.define_class(&bytes, &DirectoryClassSource::new(class_path)) {
        Ok(class) => class,
        Err(e) => {
            eprintln!("Could not load {}: {}", args.class_file.display(), e);
            process::exit(1);
        }
    };

    let name = class.name();
    println!("Loaded: {}", name);
    if args.show {
        show(&class);
    }

    if args.execute {
        if let Err(e) = vm.execute_main(&name) {
            eprintln!("Exception occurred in {}: {}", name, e);
            process::exit(1);
        }
    }
}
