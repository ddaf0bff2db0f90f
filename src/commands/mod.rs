pub mod fmt;
pub mod repl;
pub mod run;
