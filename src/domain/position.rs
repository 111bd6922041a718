/// Where a new child is inserted among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextPosition<R> {
    Start,
    End,
    Before(R),
    After(R),
    /// Follow the order the business model reports for the parent's children.
    #[default]
    Auto,
}
