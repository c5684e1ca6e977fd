mod console;

pub use console::ConsoleState;
