use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

/// The type paths a session is currently loading or saving, outermost first.
///
/// When a fill fails the stack is copied once, so the path to the failing
/// object survives the unwinding of the enclosing calls.
#[derive(Default, Clone)]
pub(crate) struct TypePathStack {
    stack: Vec<&'static str>,
    failure: Option<Vec<&'static str>>,
}

impl TypePathStack {
    pub const fn new() -> Self {
        Self {
            stack: Vec::new(),
            failure: None,
        }
    }

    #[inline]
    pub fn push(&mut self, type_path: &'static str) {
        self.stack.push(type_path);
    }

    /// Pop the innermost path, capturing the stack first if `failed`.
    #[inline]
    pub fn pop(&mut self, failed: bool) {
        if failed && self.failure.is_none() {
            self.failure = Some(self.stack.clone());
        }
        self.stack.pop();
    }

    /// Take the stack captured at the first failure.
    pub fn take_failure(&mut self) -> TypePathStack {
        self.stack.clear();
        TypePathStack {
            stack: self.failure.take().unwrap_or_default(),
            failure: None,
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.failure = None;
    }
}

impl Debug for TypePathStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut iter = self.stack.iter();

        if let Some(first) = iter.next() {
            writeln!(f, "`{first}`")?;
        }

        for path in iter {
            writeln!(f, " -> `{path}`")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::TypePathStack;

    #[test]
    fn failure_survives_unwinding() {
        let mut stack = TypePathStack::new();
        stack.push("a::Outer");
        stack.push("a::Inner");
        stack.pop(true);
        stack.pop(true);

        let failure = stack.take_failure();
        assert_eq!(format!("{failure:?}"), "`a::Outer`\n -> `a::Inner`\n");
        assert_eq!(format!("{:?}", stack.take_failure()), "");
    }
}
