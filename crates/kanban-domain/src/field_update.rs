/// Three-state update for nullable fields such as a card's description or
/// deadline, where "leave alone" and "set to null" must be told apart.
///
/// ```
/// use kanban_domain::FieldUpdate;
///
/// let mut deadline = Some(3);
/// FieldUpdate::NoChange.apply_to(&mut deadline);
/// assert_eq!(deadline, Some(3));
///
/// FieldUpdate::Set(5).apply_to(&mut deadline);
/// assert_eq!(deadline, Some(5));
///
/// FieldUpdate::Clear.apply_to(&mut deadline);
/// assert_eq!(deadline, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    NoChange,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `Some` sets, `None` clears. Use `FieldUpdate::NoChange` explicitly
    /// to leave a field untouched.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(FieldUpdate::from(Some("x")), FieldUpdate::Set("x"));
        assert_eq!(FieldUpdate::<&str>::from(None), FieldUpdate::Clear);
        assert_eq!(FieldUpdate::<u8>::default(), FieldUpdate::NoChange);
    }
}
