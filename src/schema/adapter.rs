//! Adapter between column-named tables and typed records
//!
//! Structural cells (ids, dates) must parse or the table is rejected. Metric
//! cells that are empty or unparseable become `None` and are scored as
//! neutral downstream.

use crate::error::ComputeError;
use crate::guardrails::REQUIRED_STUDENT_COLUMNS;
use crate::schema::RawTable;
use crate::types::{
    BenchmarkTable, Metric, MetricValues, SchoolBenchmark, ScoredSeries, StudentRecord,
    StudentSeries,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Columns every benchmark table must carry
pub const REQUIRED_BENCHMARK_COLUMNS: &[&str] = &[
    "school_id",
    "school_name",
    "chronic_absenteeism_pct",
    "truancy_rate_pct",
    "chronic_truancy_pct",
    "discipline_incidents_per_100",
    "graduation_rate_pct",
    "math_achievement_pct",
    "ela_achievement_pct",
    "science_achievement_pct",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Adapter for converting tables to records and back
pub struct TableAdapter;

impl TableAdapter {
    /// Parse a guardrail-cleaned student table into records (table order)
    pub fn student_records(table: &RawTable) -> Result<Vec<StudentRecord>, ComputeError> {
        require(table, "student", REQUIRED_STUDENT_COLUMNS)?;
        let cells = Cells::new(table);

        (0..table.len())
            .map(|row| -> Result<StudentRecord, ComputeError> {
                Ok(StudentRecord {
                    student_id: cells.id(row, "student_id")?,
                    week_date: cells.date(row, "week_date")?,
                    grades: cells.number(row, "grades"),
                    absences: cells.number(row, "absences"),
                    tardies: cells.number(row, "tardies"),
                    discipline_events: cells.number(row, "discipline_events"),
                    truancy_days: cells.number(row, "truancy_days"),
                })
            })
            .collect()
    }

    /// Split records into one sorted series per student, ordered by student id
    pub fn student_series(records: Vec<StudentRecord>) -> Result<Vec<StudentSeries>, ComputeError> {
        let mut by_student: BTreeMap<i64, Vec<StudentRecord>> = BTreeMap::new();
        for record in records {
            by_student.entry(record.student_id).or_default().push(record);
        }

        by_student
            .into_values()
            .map(StudentSeries::from_records)
            .collect()
    }

    /// Parse a benchmark table; school ids must be unique
    pub fn benchmark_table(table: &RawTable) -> Result<BenchmarkTable, ComputeError> {
        require(table, "benchmark", REQUIRED_BENCHMARK_COLUMNS)?;
        let cells = Cells::new(table);

        let schools = (0..table.len())
            .map(|row| -> Result<SchoolBenchmark, ComputeError> {
                Ok(SchoolBenchmark {
                    school_id: cells.id(row, "school_id")?,
                    school_name: cells.text(row, "school_name").trim().to_string(),
                    chronic_absenteeism_pct: cells.number(row, "chronic_absenteeism_pct"),
                    truancy_rate_pct: cells.number(row, "truancy_rate_pct"),
                    chronic_truancy_pct: cells.number(row, "chronic_truancy_pct"),
                    discipline_incidents_per_100: cells.number(row, "discipline_incidents_per_100"),
                    graduation_rate_pct: cells.number(row, "graduation_rate_pct"),
                    math_achievement_pct: cells.number(row, "math_achievement_pct"),
                    ela_achievement_pct: cells.number(row, "ela_achievement_pct"),
                    science_achievement_pct: cells.number(row, "science_achievement_pct"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        BenchmarkTable::from_rows(schools)
    }

    /// Flatten scoring results into a table with `sig_*`, `contrib_*` and
    /// `contrib_overall_*` columns, one row per student-week
    pub fn scored_table(results: &[ScoredSeries]) -> Result<RawTable, ComputeError> {
        let mut columns: Vec<String> = vec!["student_id".to_string(), "week_date".to_string()];
        columns.extend(Metric::ALL.iter().map(|m| m.as_str().to_string()));
        for prefix in ["sig", "contrib", "contrib_overall"] {
            columns.extend(Metric::ALL.iter().map(|m| format!("{prefix}_{m}")));
        }
        columns.extend(
            [
                "row_signal",
                "support_signal",
                "needs_supportive_check_in",
                "anchor_tardies",
                "anchor_absences",
                "anchor_truancy_days",
                "anchor_discipline_events",
                "context_multiplier",
                "school_id",
            ]
            .iter()
            .map(|c| c.to_string()),
        );

        let rows = results
            .iter()
            .flat_map(|series| {
                series.rows.iter().map(move |row| {
                    let record = &row.record;
                    let mut cells = vec![
                        record.student_id.to_string(),
                        record.week_date.format("%Y-%m-%d").to_string(),
                    ];
                    cells.extend(Metric::ALL.iter().map(|m| optional(record.value(*m))));
                    for values in [&row.signals, &row.contributions, &row.overall_contributions] {
                        cells.extend(metric_cells(values));
                    }
                    cells.extend([
                        row.row_signal.to_string(),
                        row.support_signal.to_string(),
                        row.needs_supportive_check_in.to_string(),
                        row.anchors.tardies.to_string(),
                        row.anchors.absences.to_string(),
                        row.anchors.truancy_days.to_string(),
                        row.anchors.discipline_events.to_string(),
                        row.context_multiplier.to_string(),
                        series.school_id.map(|id| id.to_string()).unwrap_or_default(),
                    ]);
                    cells
                })
            })
            .collect();

        RawTable::new(columns, rows)
    }
}

fn require(table: &RawTable, name: &str, required: &[&str]) -> Result<(), ComputeError> {
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ComputeError::MissingColumns {
            table: name.to_string(),
            columns: missing,
        })
    }
}

fn metric_cells(values: &MetricValues) -> impl Iterator<Item = String> + '_ {
    Metric::ALL.iter().map(move |m| values.get(*m).to_string())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Column-name access to one table's cells
struct Cells<'a> {
    table: &'a RawTable,
}

impl<'a> Cells<'a> {
    fn new(table: &'a RawTable) -> Self {
        Self { table }
    }

    fn text(&self, row: usize, column: &str) -> &'a str {
        self.table
            .column_index(column)
            .and_then(|i| self.table.rows().get(row).map(|r| r[i].as_str()))
            .unwrap_or("")
    }

    fn invalid(&self, row: usize, column: &str) -> ComputeError {
        ComputeError::InvalidCell {
            row,
            column: column.to_string(),
            value: self.text(row, column).to_string(),
        }
    }

    /// Integer id; "12.0" is accepted as 12, values outside i64 are rejected
    fn id(&self, row: usize, column: &str) -> Result<i64, ComputeError> {
        let raw = self.text(row, column).trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(id);
        }
        match raw.parse::<f64>() {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            Ok(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
                Ok(v as i64)
            }
            _ => Err(self.invalid(row, column)),
        }
    }

    /// Calendar date; a trailing time component is ignored
    fn date(&self, row: usize, column: &str) -> Result<NaiveDate, ComputeError> {
        let raw = self.text(row, column).trim();
        let date_part = raw.split(|c: char| c == ' ' || c == 'T').next().unwrap_or(raw);
        DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())
            .ok_or_else(|| self.invalid(row, column))
    }

    /// Numeric metric; empty or unparseable cells are missing
    fn number(&self, row: usize, column: &str) -> Option<f64> {
        self.text(row, column)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::scoring::ScoreComposer;
    use pretty_assertions::assert_eq;

    const STUDENT_COLUMNS: &[&str] = &[
        "student_id",
        "week_date",
        "grades",
        "tardies",
        "absences",
        "discipline_events",
        "truancy_days",
    ];

    fn students(rows: &[&[&str]]) -> RawTable {
        RawTable::from_strs(STUDENT_COLUMNS, rows).unwrap()
    }

    fn benchmarks(rows: &[&[&str]]) -> RawTable {
        RawTable::from_strs(REQUIRED_BENCHMARK_COLUMNS, rows).unwrap()
    }

    #[test]
    fn test_parse_student_records() {
        let table = students(&[
            &["4", "2024-02-12", "71.5", "1", "2", "0", "0"],
            &["4.0", "2024-02-05 00:00:00", "", "0", "n/a", "1", "0"],
        ]);
        let records = TableAdapter::student_records(&table).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].grades, Some(71.5));
        assert_eq!(records[0].absences, Some(2.0));
        assert_eq!(records[1].student_id, 4);
        assert_eq!(records[1].week_date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(records[1].grades, None);
        assert_eq!(records[1].absences, None);
    }

    #[test]
    fn test_missing_student_columns_named() {
        let table = RawTable::from_strs(&["student_id", "grades"], &[&["1", "80"]]).unwrap();
        let err = TableAdapter::student_records(&table).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Missing required student columns: week_date, tardies, absences, discipline_events, truancy_days"
        );
    }

    #[test]
    fn test_bad_date_rejected() {
        let table = students(&[&["4", "last week", "70", "0", "0", "0", "0"]]);
        let err = TableAdapter::student_records(&table).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidCell { row: 0, ref column, .. } if column == "week_date"));
    }

    #[test]
    fn test_out_of_range_id_rejected() {
        for id in ["1e30", "-1e30", "9223372036854775808", "inf"] {
            let table = students(&[&[id, "2024-02-05", "70", "0", "0", "0", "0"]]);
            let err = TableAdapter::student_records(&table).unwrap_err();
            assert!(
                matches!(err, ComputeError::InvalidCell { row: 0, ref column, .. } if column == "student_id"),
                "{id} accepted"
            );
        }

        let table = students(&[&["1e3", "2024-02-05", "70", "0", "0", "0", "0"]]);
        assert_eq!(TableAdapter::student_records(&table).unwrap()[0].student_id, 1000);
    }

    #[test]
    fn test_scored_table_columns_and_rows() {
        let table = students(&[
            &["4", "2024-02-19", "60", "0", "8", "0", "0"],
            &["4", "2024-02-05", "60", "0", "1", "0", "0"],
            &["4", "2024-02-12", "60", "0", "1", "0", "0"],
        ]);
        let series = TableAdapter::student_series(TableAdapter::student_records(&table).unwrap())
            .unwrap();
        let scored = ScoreComposer::score(&series[0], &ScoringConfig::default()).unwrap();

        let output = TableAdapter::scored_table(std::slice::from_ref(&scored)).unwrap();

        let mut expected: Vec<String> = [
            "student_id",
            "week_date",
            "grades",
            "absences",
            "tardies",
            "discipline_events",
            "truancy_days",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        for prefix in ["sig", "contrib", "contrib_overall"] {
            for metric in ["grades", "absences", "tardies", "discipline_events", "truancy_days"] {
                expected.push(format!("{prefix}_{metric}"));
            }
        }
        expected.extend(
            [
                "row_signal",
                "support_signal",
                "needs_supportive_check_in",
                "anchor_tardies",
                "anchor_absences",
                "anchor_truancy_days",
                "anchor_discipline_events",
                "context_multiplier",
                "school_id",
            ]
            .iter()
            .map(|c| c.to_string()),
        );
        assert_eq!(output.columns(), expected.as_slice());
        assert_eq!(output.len(), 3);

        let cell = |row: usize, column: &str| -> String {
            output.rows()[row][output.column_index(column).unwrap()].clone()
        };
        let weeks: Vec<String> = (0..3).map(|row| cell(row, "week_date")).collect();
        assert_eq!(weeks, vec!["2024-02-05", "2024-02-12", "2024-02-19"]);

        for row in 0..3 {
            let overall: f64 = cell(row, "contrib_overall_absences").parse().unwrap();
            assert_eq!(overall, scored.overall_contributions.absences);
            let multiplier: f64 = cell(row, "context_multiplier").parse().unwrap();
            assert_eq!(multiplier, 1.0);
            assert_eq!(cell(row, "school_id"), "");
        }
        assert_eq!(cell(2, "absences"), "8");
        assert_eq!(cell(2, "sig_absences").parse::<f64>().unwrap(), 1.0);
        assert_eq!(cell(2, "anchor_absences"), "5");
    }

    #[test]
    fn test_student_series_grouped_and_sorted() {
        let table = students(&[
            &["5", "2024-02-12", "70", "0", "0", "0", "0"],
            &["4", "2024-02-12", "70", "0", "0", "0", "0"],
            &["4", "2024-02-05", "70", "0", "0", "0", "0"],
        ]);
        let records = TableAdapter::student_records(&table).unwrap();
        let series = TableAdapter::student_series(records).unwrap();

        let ids: Vec<i64> = series.iter().map(|s| s.student_id()).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(series[0].records()[0].week_date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
    }

    #[test]
    fn test_parse_benchmarks() {
        let table = benchmarks(&[
            &["1006", " Riverside High ", "22.5", "9", "4", "30", "88", "40", "50", ""],
            &["1007", "Hillcrest", "10", "5", "2", "12", "93", "60", "65", "58"],
        ]);
        let benchmarks = TableAdapter::benchmark_table(&table).unwrap();

        let riverside = benchmarks.get(1006).unwrap();
        assert_eq!(riverside.school_name, "Riverside High");
        assert_eq!(riverside.chronic_absenteeism_pct, Some(22.5));
        assert_eq!(riverside.science_achievement_pct, None);
        assert_eq!(benchmarks.len(), 2);
    }

    #[test]
    fn test_missing_benchmark_columns() {
        let table = RawTable::from_strs(&["school_id", "school_name"], &[&["1", "A"]]).unwrap();
        let err = TableAdapter::benchmark_table(&table).unwrap_err();
        match err {
            ComputeError::MissingColumns { table, columns } => {
                assert_eq!(table, "benchmark");
                assert_eq!(columns.len(), REQUIRED_BENCHMARK_COLUMNS.len() - 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_school_rejected() {
        let row: &[&str] = &["1006", "A", "1", "1", "1", "1", "1", "1", "1", "1"];
        let table = benchmarks(&[row, row]);
        assert!(matches!(
            TableAdapter::benchmark_table(&table),
            Err(ComputeError::DuplicateSchool(1006))
        ));
    }
}
