use std::sync::Mutex;

/// Where an invocation writes its output.
pub trait UserInterface: Send + Sync {
    fn print(&self, message: String);
    fn print_error(&self, message: String);
}

/// Standard out and standard error.
#[derive(Debug, Default)]
pub struct Console {}

impl UserInterface for Console {
    fn print(&self, message: String) {
        println!("{message}");
    }

    fn print_error(&self, message: String) {
        eprintln!("{message}");
    }
}

/// Captures every message, ex: for a REPL host or for tests.
#[derive(Debug, Default)]
pub struct MemoryInterface {
    messages: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl MemoryInterface {
    /// The messages printed so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("internal error - interface lock poisoned")
            .clone()
    }

    /// The errors printed so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .expect("internal error - interface lock poisoned")
            .clone()
    }

    /// Take and clear both buffers.
    pub fn consume(&self) -> (Vec<String>, Vec<String>) {
        let messages = std::mem::take(
            &mut *self
                .messages
                .lock()
                .expect("internal error - interface lock poisoned"),
        );
        let errors = std::mem::take(
            &mut *self
                .errors
                .lock()
                .expect("internal error - interface lock poisoned"),
        );
        (messages, errors)
    }
}

impl UserInterface for MemoryInterface {
    fn print(&self, message: String) {
        self.messages
            .lock()
            .expect("internal error - interface lock poisoned")
            .push(message);
    }

    fn print_error(&self, message: String) {
        self.errors
            .lock()
            .expect("internal error - interface lock poisoned")
            .push(message);
    }
}
