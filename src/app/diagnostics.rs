use log::{Level, Log, Metadata, Record};
use std::fmt;

/// Logging handle handed to each component at construction.
///
/// Wraps any `log::Log` implementation so production code can log through
/// the process-wide logger while tests inject a capturing one.
#[derive(Clone, Copy)]
pub struct Diagnostics<'a> {
    logger: &'a dyn Log,
    target: &'static str,
}

impl Diagnostics<'static> {
    /// Logs through whatever logger `env_logger` (or anyone else) installed.
    pub fn global(target: &'static str) -> Self {
        Self {
            logger: log::logger(),
            target,
        }
    }
}

impl<'a> Diagnostics<'a> {
    pub fn new(logger: &'a dyn Log, target: &'static str) -> Self {
        Self { logger, target }
    }

    /// Same sink, different target.
    pub fn with_target(self, target: &'static str) -> Self {
        Self { target, ..self }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl fmt::Debug for Diagnostics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use log::{Level, Log, Metadata, Record};
    use std::sync::Mutex;

    /// Records every message so tests can assert on what was logged.
    #[derive(Default)]
    pub struct CapturingLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl CapturingLogger {
        pub fn messages(&self, level: Level) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    impl Log for CapturingLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }
}
