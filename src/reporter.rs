use super::error::*;
use log::error;

/// Sink for diagnostics produced while scanning, parsing, resolving and
/// running a program. A run never decides what to do with an error beyond
/// handing it here.
pub trait Reporter {
    fn report(&mut self, error: LoxError);
}

/// Reports every diagnostic through the `log` facade.
#[derive(Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, err: LoxError) {
        error!("{}", err);
    }
}

/// Keeps every diagnostic for later inspection.
#[derive(Default)]
pub struct CollectingReporter {
    pub errors: Vec<LoxError>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|err| err.to_string()).collect()
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, err: LoxError) {
        self.errors.push(err);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mock_logger::MockLogger;

    #[test]
    fn log_reporter() {
        mock_logger::init();
        let mut reporter = LogReporter;
        reporter.report(RuntimeError::UndefinedVariable("foo".into()).at(2));
        MockLogger::entries(|entries| {
            assert_eq!(entries.len(), 1);
            assert_eq!(
                entries[0].body,
                "Runtime error on line 2: Undefined variable \"foo\""
            );
        });
    }

    #[test]
    fn collecting_reporter() {
        let mut reporter = CollectingReporter::new();
        assert!(reporter.is_empty());
        reporter.report(LoxError::Resolution(ResolutionError::ThisOutsideClass, 4));
        reporter.report(RuntimeError::NotCallable.at(5));
        assert_eq!(reporter.errors.len(), 2);
        assert_eq!(
            reporter.messages()[0],
            "Resolution error on line 4: Cannot use \"this\" outside of a class"
        );
    }
}
