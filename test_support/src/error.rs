//! Error formatting for stable assertions.

use std::error::Error;

/// Join an error and its sources, outermost first, with `": "`.
///
/// Pass a `miette::Report`-like wrapper through [`AsRef::as_ref`].
#[must_use]
pub fn display_error_chain<'a>(err: &'a (dyn Error + 'static)) -> String {
    std::iter::successors(Some(err), |&current: &&'a (dyn Error + 'static)| {
        current.source()
    })
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fmt, io};

    #[derive(Debug)]
    struct Outer(io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn joins_sources() {
        let err = Outer(io::Error::other("inner"));
        assert_eq!(display_error_chain(&err), "outer: inner");
    }
}
