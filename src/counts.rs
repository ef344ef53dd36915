//! Result-status and CPI-band head counts over the complete dataset.
//!
//! Unlike the inclusive distribution bands, CPI bands are disjoint: every
//! non-negative CPI lands in exactly one band.

use serde::Serialize;

use crate::{aggregate::round2, error::AnalysisError, students::StudentRoster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CpiBand {
    #[serde(rename = ">75.00")]
    Above75,
    #[serde(rename = "69.51-75.00")]
    From69_51To75,
    #[serde(rename = "59.51-69.50")]
    From59_51To69_50,
    #[serde(rename = "49.51-59.50")]
    From49_51To59_50,
    #[serde(rename = "45.00-49.50")]
    From45To49_50,
    #[serde(rename = "<45.00")]
    Below45,
}

impl CpiBand {
    pub const ALL: [CpiBand; 6] = [
        CpiBand::Above75,
        CpiBand::From69_51To75,
        CpiBand::From59_51To69_50,
        CpiBand::From49_51To59_50,
        CpiBand::From45To49_50,
        CpiBand::Below45,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CpiBand::Above75 => ">75.00",
            CpiBand::From69_51To75 => "69.51-75.00",
            CpiBand::From59_51To69_50 => "59.51-69.50",
            CpiBand::From49_51To59_50 => "49.51-59.50",
            CpiBand::From45To49_50 => "45.00-49.50",
            CpiBand::Below45 => "<45.00",
        }
    }

    pub fn classify(cpi: f64) -> Option<CpiBand> {
        if !cpi.is_finite() || cpi < 0.0 {
            None
        } else if cpi > 75.0 {
            Some(CpiBand::Above75)
        } else if cpi > 69.5 {
            Some(CpiBand::From69_51To75)
        } else if cpi > 59.5 {
            Some(CpiBand::From59_51To69_50)
        } else if cpi > 49.5 {
            Some(CpiBand::From49_51To59_50)
        } else if cpi >= 45.0 {
            Some(CpiBand::From45To49_50)
        } else {
            Some(CpiBand::Below45)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpiBandCount {
    pub band: CpiBand,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub total_appeared: usize,
    pub passed: usize,
    pub reappeared: usize,
    pub held: usize,
    /// `None` when the sheet has no CPI column.
    pub cpi_band_counts: Option<Vec<CpiBandCount>>,
    pub pass_percentage: f64,
}

impl CategoryCounts {
    pub fn band(&self, band: CpiBand) -> Option<usize> {
        self.cpi_band_counts.as_ref().map(|counts| {
            counts
                .iter()
                .find(|entry| entry.band == band)
                .map(|entry| entry.count)
                .unwrap_or(0)
        })
    }
}

fn remark_contains(remarks: Option<&str>, needle: &str) -> bool {
    remarks.is_some_and(|text| text.to_lowercase().contains(needle))
}

pub fn pass_percentage(passed: usize, total_appeared: usize) -> f64 {
    if total_appeared == 0 {
        0.0
    } else {
        round2(passed as f64 / total_appeared as f64 * 100.0)
    }
}

/// Status counts only consider records with an enrollment number, so
/// `passed <= total_appeared` always holds. Only the Remarks column is
/// required; CPI bands are left empty here and come from [`count_cpi_bands`].
pub fn count_categories(roster: &StudentRoster) -> Result<CategoryCounts, AnalysisError> {
    roster.require_remarks()?;

    let appeared = roster
        .records
        .iter()
        .filter(|record| record.enrollment_no.is_some())
        .collect::<Vec<_>>();
    let status = |needle: &str| {
        appeared
            .iter()
            .filter(|record| remark_contains(record.remarks.as_deref(), needle))
            .count()
    };
    let total_appeared = appeared.len();
    let passed = status("pass");

    Ok(CategoryCounts {
        total_appeared,
        passed,
        reappeared: status("re-appear"),
        held: status("result hold"),
        cpi_band_counts: None,
        pass_percentage: pass_percentage(passed, total_appeared),
    })
}

/// Head count per CPI band over every record with a CPI.
pub fn count_cpi_bands(roster: &StudentRoster) -> Result<Vec<CpiBandCount>, AnalysisError> {
    roster.require_cpi()?;
    let mut band_counts = [0usize; 6];
    for cpi in roster.records.iter().filter_map(|record| record.cpi) {
        if let Some(band) = CpiBand::classify(cpi) {
            band_counts[band as usize] += 1;
        }
    }
    Ok(CpiBand::ALL
        .iter()
        .zip(band_counts)
        .map(|(band, count)| CpiBandCount { band: *band, count })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::students::{StudentFields, StudentRecord};

    fn roster(entries: &[(Option<&str>, Option<&str>, Option<f64>)]) -> StudentRoster {
        StudentRoster {
            fields: StudentFields {
                enrollment: 0,
                name: 1,
                remarks: Some(2),
                cpi: Some(3),
                grand_total: None,
            },
            records: entries
                .iter()
                .enumerate()
                .map(|(idx, (enrollment, remarks, cpi))| StudentRecord {
                    row: idx + 2,
                    enrollment_no: enrollment.map(str::to_string),
                    name: format!("S{idx}"),
                    remarks: remarks.map(str::to_string),
                    cpi: *cpi,
                    grand_total: None,
                })
                .collect(),
        }
    }

    #[test]
    fn remark_substrings_match_case_insensitively() {
        let roster = roster(&[
            (Some("A1"), Some("Pass"), Some(80.0)),
            (Some("A2"), Some("RE-APPEAR"), Some(40.0)),
            (Some("A3"), Some("Result hold"), None),
            (Some("A4"), Some("PASSED"), Some(70.0)),
        ]);
        let counts = count_categories(&roster).unwrap();
        assert_eq!(counts.total_appeared, 4);
        assert_eq!(counts.passed, 2);
        assert_eq!(counts.reappeared, 1);
        assert_eq!(counts.held, 1);
        assert_eq!(counts.pass_percentage, 50.0);
    }

    #[test]
    fn records_without_enrollment_are_not_counted() {
        let roster = roster(&[
            (Some("A1"), Some("Pass"), Some(80.0)),
            (None, Some("Pass"), None),
        ]);
        let counts = count_categories(&roster).unwrap();
        assert_eq!(counts.total_appeared, 1);
        assert_eq!(counts.passed, 1);
        assert_eq!(counts.pass_percentage, 100.0);
    }

    #[test]
    fn empty_roster_has_zero_pass_percentage() {
        let counts = count_categories(&roster(&[])).unwrap();
        assert_eq!(counts.total_appeared, 0);
        assert_eq!(counts.pass_percentage, 0.0);
        assert_eq!(count_cpi_bands(&roster(&[])).unwrap().len(), 6);
    }

    #[test]
    fn cpi_bands_are_disjoint_at_boundaries() {
        assert_eq!(CpiBand::classify(75.0), Some(CpiBand::From69_51To75));
        assert_eq!(CpiBand::classify(75.001), Some(CpiBand::Above75));
        assert_eq!(CpiBand::classify(69.5), Some(CpiBand::From59_51To69_50));
        assert_eq!(CpiBand::classify(69.51), Some(CpiBand::From69_51To75));
        assert_eq!(CpiBand::classify(49.5), Some(CpiBand::From45To49_50));
        assert_eq!(CpiBand::classify(45.0), Some(CpiBand::From45To49_50));
        assert_eq!(CpiBand::classify(44.99), Some(CpiBand::Below45));
        assert_eq!(CpiBand::classify(0.0), Some(CpiBand::Below45));
        assert_eq!(CpiBand::classify(-1.0), None);
    }

    #[test]
    fn band_counts_follow_cpi_values() {
        let roster = roster(&[
            (Some("A1"), Some("Pass"), Some(82.5)),
            (Some("A2"), Some("Pass"), Some(90.0)),
            (Some("A3"), Some("Pass"), Some(74.2)),
            (Some("A4"), Some("Re-appear"), Some(44.1)),
        ]);
        let counts = CategoryCounts {
            cpi_band_counts: Some(count_cpi_bands(&roster).unwrap()),
            ..count_categories(&roster).unwrap()
        };
        assert_eq!(counts.band(CpiBand::Above75), Some(2));
        assert_eq!(counts.band(CpiBand::From69_51To75), Some(1));
        assert_eq!(counts.band(CpiBand::Below45), Some(1));
        assert_eq!(counts.band(CpiBand::From45To49_50), Some(0));
    }

    #[test]
    fn status_counts_do_not_need_cpi() {
        let mut roster = roster(&[
            (Some("A1"), Some("Pass"), None),
            (Some("A2"), Some("Re-appear"), None),
        ]);
        roster.fields.cpi = None;
        let counts = count_categories(&roster).unwrap();
        assert_eq!(counts.passed, 1);
        assert_eq!(counts.reappeared, 1);
        assert_eq!(counts.pass_percentage, 50.0);
        assert_eq!(counts.band(CpiBand::Above75), None);
        assert!(matches!(
            count_cpi_bands(&roster),
            Err(AnalysisError::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn missing_remarks_column_fails_the_stage() {
        let mut roster = roster(&[(Some("A1"), Some("Pass"), Some(80.0))]);
        roster.fields.remarks = None;
        assert!(matches!(
            count_categories(&roster),
            Err(AnalysisError::RequiredFieldMissing { .. })
        ));
    }
}
