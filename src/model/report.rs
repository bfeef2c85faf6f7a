//! Tabular grading report

use super::grade::Grade;
use super::region::DiscId;
use serde::Serialize;

/// Column headers, in output order
pub const REPORT_COLUMNS: [&str; 12] = [
    "disc",
    "pfirrmann",
    "narrowing",
    "central_canal_stenosis",
    "spondylolisthesis",
    "upper_marrow",
    "lower_marrow",
    "upper_endplate_defect",
    "lower_endplate_defect",
    "foraminal_stenosis_left",
    "foraminal_stenosis_right",
    "herniation",
];

/// One report row. Flags are written as 0/1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub disc: String,
    pub pfirrmann: u8,
    pub narrowing: u8,
    pub central_canal_stenosis: u8,
    pub spondylolisthesis: u8,
    pub upper_marrow: u8,
    pub lower_marrow: u8,
    pub upper_endplate_defect: u8,
    pub lower_endplate_defect: u8,
    pub foraminal_stenosis_left: u8,
    pub foraminal_stenosis_right: u8,
    pub herniation: u8,
}

impl From<&Grade> for ReportRow {
    fn from(grade: &Grade) -> Self {
        Self {
            disc: grade.disc.to_string(),
            pfirrmann: grade.pfirrmann,
            narrowing: grade.narrowing,
            central_canal_stenosis: grade.central_canal_stenosis,
            spondylolisthesis: grade.spondylolisthesis.into(),
            upper_marrow: grade.upper_marrow.into(),
            lower_marrow: grade.lower_marrow.into(),
            upper_endplate_defect: grade.upper_endplate_defect.into(),
            lower_endplate_defect: grade.lower_endplate_defect.into(),
            foraminal_stenosis_left: grade.foraminal_stenosis_left.into(),
            foraminal_stenosis_right: grade.foraminal_stenosis_right.into(),
            herniation: grade.herniation.into(),
        }
    }
}

impl ReportRow {
    pub fn cells(&self) -> [String; 12] {
        [
            self.disc.clone(),
            self.pfirrmann.to_string(),
            self.narrowing.to_string(),
            self.central_canal_stenosis.to_string(),
            self.spondylolisthesis.to_string(),
            self.upper_marrow.to_string(),
            self.lower_marrow.to_string(),
            self.upper_endplate_defect.to_string(),
            self.lower_endplate_defect.to_string(),
            self.foraminal_stenosis_left.to_string(),
            self.foraminal_stenosis_right.to_string(),
            self.herniation.to_string(),
        ]
    }
}

/// Grades keyed by disc, in pipeline order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    grades: Vec<Grade>,
}

impl Report {
    pub fn from_grades(grades: Vec<Grade>) -> Self {
        Self { grades }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn discs(&self) -> Vec<DiscId> {
        self.grades.iter().map(|g| g.disc).collect()
    }

    pub fn get(&self, disc: &DiscId) -> Option<&Grade> {
        self.grades.iter().find(|g| &g.disc == disc)
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.grades.iter().map(ReportRow::from).collect()
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keep_order_and_encode_flags() {
        let mut first = Grade::healthy("L3-L4".parse().unwrap());
        first.herniation = true;
        let second = Grade::healthy("L4-L5".parse().unwrap());
        let report = Report::from_grades(vec![first, second]);

        let rows = report.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].disc, "L3-L4");
        assert_eq!(rows[0].herniation, 1);
        assert_eq!(rows[1].herniation, 0);
        assert_eq!(rows[0].cells().len(), REPORT_COLUMNS.len());
    }

    #[test]
    fn test_lookup_by_disc() {
        let report = Report::from_grades(vec![Grade::healthy("L1-L2".parse().unwrap())]);
        assert!(report.get(&"L1-L2".parse().unwrap()).is_some());
        assert!(report.get(&"L2-L3".parse().unwrap()).is_none());
        assert!(Report::empty().is_empty());
    }
}
