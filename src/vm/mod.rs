pub mod vm;
pub mod thread;
pub mod value;
pub mod instructions;
pub mod class_loader;
