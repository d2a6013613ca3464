/// Behaviour switches of an [InstantiationService](crate::InstantiationService)
///
/// Child scopes inherit the options of their parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstantiationOptions {
    /// Fail instead of warning when the supplied arguments don't match the free parameters
    /// of a constructor
    pub strict: bool,
    /// Log every construction together with the time it took
    pub trace: bool,
}

impl InstantiationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
