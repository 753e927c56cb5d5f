//! Test helpers shared by the shapeinfer crates.

use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe, RefUnwindSafe};

/// Runs a test function over a table of cases.
///
/// Each case is run even if an earlier one fails. Once all cases have run,
/// the test panics if any of them did, listing the failing cases.
///
/// ```
/// use shapeinfer_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     size: i64,
///     chunks: i64,
///     expected: i64,
/// }
///
/// let cases = [
///     Case { size: 10, chunks: 3, expected: 4 },
///     Case { size: 6, chunks: 2, expected: 3 },
/// ];
///
/// cases.test_each(|case| {
///     let chunk_size = (case.size + case.chunks - 1) / case.chunks;
///     assert_eq!(chunk_size, case.expected);
/// });
/// ```
///
/// Cases and the values captured by the test function must be unwind safe.
/// Fields which are not can be wrapped in
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe).
pub trait TestCases {
    type Case;

    /// Call `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Call `test` with each case by value.
    ///
    /// The debug representation of each case is captured before the test
    /// function is called, so it can be reported if the case fails.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug;
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + RefUnwindSafe,
    {
        let failures: Vec<String> = self
            .into_iter()
            .filter(|case| catch_unwind(|| test(case)).is_err())
            .map(|case| format!("{:?}", case))
            .collect();
        report_failures(&failures);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        I::Item: Debug,
    {
        let mut failures = Vec::new();
        for case in self {
            let desc = format!("{:?}", case);
            if catch_unwind(AssertUnwindSafe(|| test(case))).is_err() {
                failures.push(desc);
            }
        }
        report_failures(&failures);
    }
}

fn report_failures(failures: &[String]) {
    assert!(
        failures.is_empty(),
        "{} test cases failed: [{}]",
        failures.len(),
        failures.join(", ")
    );
}
