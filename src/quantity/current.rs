quantity!(Amperes, "A", 2);

impl Amperes {
    /// Zero phase readings come from sensor dropout rather than from an idle line.
    #[must_use]
    pub fn is_significant(self) -> bool {
        self.0 > 0.0
    }
}
