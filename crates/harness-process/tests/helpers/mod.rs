pub mod scripts;

pub use scripts::ScriptDir;
