//! Statistical analysis of typing samples: advisory significance tests and
//! regression telemetry. Nothing here decides acceptance.

pub mod regression;
pub mod significance;

pub use regression::{cross_validate, CrossValidation, StandardScaler, TypingModel};
pub use significance::{
    f_oneway, t_test_ind, Significance, SignificanceReport, SignificanceTester, TestResult,
};
