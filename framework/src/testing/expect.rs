//! Fluent assertions

use std::fmt::Debug;

fn fail(location: &str, call: &str, detail: String) -> ! {
    panic!("\nassertion failed at {}\n  {}\n\n{}\n", location, call, detail)
}

/// Value under assertion, created by `expect!`
pub struct Expect<T> {
    value: T,
    location: &'static str,
}

impl<T> Expect<T> {
    pub fn new(value: T, location: &'static str) -> Self {
        Self { value, location }
    }
}

impl<T: Debug + PartialEq> Expect<T> {
    pub fn to_equal(&self, expected: T) {
        if self.value != expected {
            fail(
                self.location,
                "expect!(actual).to_equal(expected)",
                format!("  Expected: {:?}\n  Received: {:?}", expected, self.value),
            );
        }
    }

    pub fn to_not_equal(&self, unexpected: T) {
        if self.value == unexpected {
            fail(
                self.location,
                "expect!(actual).to_not_equal(value)",
                format!("  Expected NOT: {:?}\n  Received: {:?}", unexpected, self.value),
            );
        }
    }
}

impl Expect<bool> {
    pub fn to_be_true(&self) {
        if !self.value {
            fail(self.location, "expect!(value).to_be_true()", "  Received: false".into());
        }
    }

    pub fn to_be_false(&self) {
        if self.value {
            fail(self.location, "expect!(value).to_be_false()", "  Received: true".into());
        }
    }
}

impl<T: Debug> Expect<Option<T>> {
    pub fn to_be_some(&self) {
        if self.value.is_none() {
            fail(self.location, "expect!(option).to_be_some()", "  Received: None".into());
        }
    }

    pub fn to_be_none(&self) {
        if let Some(v) = &self.value {
            fail(
                self.location,
                "expect!(option).to_be_none()",
                format!("  Received: Some({:?})", v),
            );
        }
    }
}

impl<T: Debug, E: Debug> Expect<Result<T, E>> {
    pub fn to_be_ok(&self) {
        if let Err(e) = &self.value {
            fail(self.location, "expect!(result).to_be_ok()", format!("  Received: Err({:?})", e));
        }
    }

    pub fn to_be_err(&self) {
        if let Ok(v) = &self.value {
            fail(self.location, "expect!(result).to_be_err()", format!("  Received: Ok({:?})", v));
        }
    }
}

impl Expect<String> {
    pub fn to_contain(&self, substring: &str) {
        if !self.value.contains(substring) {
            fail(
                self.location,
                "expect!(string).to_contain(substring)",
                format!("  Expected to contain: {:?}\n  Received: {:?}", substring, self.value),
            );
        }
    }
}

impl<T: Debug + PartialEq> Expect<Vec<T>> {
    pub fn to_have_length(&self, expected: usize) {
        if self.value.len() != expected {
            fail(
                self.location,
                "expect!(vec).to_have_length(n)",
                format!(
                    "  Expected length: {}\n  Received length: {}\n  Received: {:?}",
                    expected,
                    self.value.len(),
                    self.value
                ),
            );
        }
    }

    pub fn to_contain(&self, item: &T) {
        if !self.value.contains(item) {
            fail(
                self.location,
                "expect!(vec).to_contain(item)",
                format!("  Expected to contain: {:?}\n  Received: {:?}", item, self.value),
            );
        }
    }

    pub fn to_be_empty(&self) {
        if !self.value.is_empty() {
            fail(
                self.location,
                "expect!(vec).to_be_empty()",
                format!("  Received: {:?}", self.value),
            );
        }
    }
}
