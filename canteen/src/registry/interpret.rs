//! Mapping extracted rows onto the five registry fields.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::normalize::normalize_name;

/// Minimum number of recognised header cells for row 0 to count as a header.
const HEADER_MIN_FIELDS: usize = 3;

/// Number of positional columns before the class name.
const POSITIONAL_MIN_CELLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    StudentCode,
    BirthDate,
    ClassName,
}

/// Header spellings accepted for each field, already in `normalize_name` form.
static HEADER_ALIASES: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    let table: &[(Field, &[&str])] = &[
        (
            Field::FirstName,
            &["first_name", "first name", "firstname", "given name", "prenom", "prenoms", "prenom(s)"],
        ),
        (
            Field::LastName,
            &["last_name", "last name", "lastname", "surname", "family name", "nom", "nom de famille"],
        ),
        (
            Field::StudentCode,
            &[
                "student_code",
                "student code",
                "student id",
                "code",
                "matricule",
                "code eleve",
                "code_eleve",
                "numero matricule",
                "n° matricule",
            ],
        ),
        (
            Field::BirthDate,
            &[
                "birth_date",
                "birth date",
                "birthdate",
                "date of birth",
                "dob",
                "date",
                "date de naissance",
                "date naissance",
                "date_naissance",
                "ne(e) le",
                "ne le",
            ],
        ),
        (Field::ClassName, &["class_name", "class name", "class", "grade", "classe", "niveau"]),
    ];

    table
        .iter()
        .flat_map(|(field, aliases)| aliases.iter().map(move |alias| (*alias, *field)))
        .collect()
});

/// A registry row as read from the upload, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCandidateRow {
    pub first_name: String,
    pub last_name: String,
    pub student_code: String,
    pub birth_date: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub students: Vec<ParsedCandidateRow>,
    pub invalid_rows: Vec<Vec<String>>,
}

/// Column positions of each field located in a header row.
fn header_columns(header: &[String]) -> HashMap<Field, usize> {
    let mut columns = HashMap::new();
    for (index, cell) in header.iter().enumerate() {
        if let Some(field) = HEADER_ALIASES.get(normalize_name(cell).as_str()) {
            columns.entry(*field).or_insert(index);
        }
    }
    columns
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn from_header(row: &[String], columns: &HashMap<Field, usize>) -> ParsedCandidateRow {
    let at = |field| cell(row, columns.get(&field).copied());
    ParsedCandidateRow {
        first_name: at(Field::FirstName),
        last_name: at(Field::LastName),
        student_code: at(Field::StudentCode),
        birth_date: at(Field::BirthDate),
        class_name: at(Field::ClassName),
    }
}

fn from_position(row: &[String]) -> ParsedCandidateRow {
    let class_name = row[4..]
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    ParsedCandidateRow {
        first_name: cell(row, Some(0)),
        last_name: cell(row, Some(1)),
        student_code: cell(row, Some(2)),
        birth_date: cell(row, Some(3)),
        class_name,
    }
}

impl ParsedCandidateRow {
    fn is_complete(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.student_code,
            &self.birth_date,
            &self.class_name,
        ]
        .iter()
        .all(|value| !value.is_empty())
    }
}

/// Interpret extracted rows, detecting an optional header in row 0.
pub fn interpret_rows(rows: &[Vec<String>]) -> Interpretation {
    let mut interpretation = Interpretation::default();
    let Some(first) = rows.first() else {
        return interpretation;
    };

    let columns = header_columns(first);
    let has_header = columns.len() >= HEADER_MIN_FIELDS;
    let data = if has_header { &rows[1..] } else { rows };
    tracing::debug!(has_header, located = columns.len(), rows = data.len(), "Interpreting registry rows");

    for row in data {
        if row.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        let candidate = if has_header {
            from_header(row, &columns)
        } else if row.len() < POSITIONAL_MIN_CELLS {
            interpretation.invalid_rows.push(row.clone());
            continue;
        } else {
            from_position(row)
        };

        if candidate.is_complete() {
            interpretation.students.push(candidate);
        } else {
            interpretation.invalid_rows.push(row.clone());
        }
    }

    interpretation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_header_row_is_detected_and_skipped() {
        let rows = vec![
            row(&["prenom", "nom", "code", "date", "classe"]),
            row(&["Awa", "Traore", "AB-12", "01/03/2015", "CM2"]),
        ];
        let result = interpret_rows(&rows);
        assert!(result.invalid_rows.is_empty());
        assert_eq!(
            result.students,
            vec![ParsedCandidateRow {
                first_name: "Awa".to_string(),
                last_name: "Traore".to_string(),
                student_code: "AB-12".to_string(),
                birth_date: "01/03/2015".to_string(),
                class_name: "CM2".to_string(),
            }]
        );
    }

    #[test]
    fn test_header_columns_in_any_order_with_accents() {
        let rows = vec![
            row(&["Classe", "Matricule", "Date de naissance", "NOM", "Prénom"]),
            row(&["CE1", "C-7", "2014-05-02", "Kone", "Ibrahim"]),
        ];
        let result = interpret_rows(&rows);
        assert_eq!(result.students.len(), 1);
        let student = &result.students[0];
        assert_eq!(student.first_name, "Ibrahim");
        assert_eq!(student.last_name, "Kone");
        assert_eq!(student.student_code, "C-7");
        assert_eq!(student.birth_date, "2014-05-02");
        assert_eq!(student.class_name, "CE1");
    }

    #[test]
    fn test_partial_header_still_counts_with_three_fields() {
        let rows = vec![
            row(&["first name", "last name", "student code", "remarks"]),
            row(&["Awa", "Traore", "AB-12", "ok"]),
        ];
        let result = interpret_rows(&rows);
        // Birth date and class cannot be located, so the data row is incomplete
        assert!(result.students.is_empty());
        assert_eq!(result.invalid_rows, vec![row(&["Awa", "Traore", "AB-12", "ok"])]);
    }

    #[test]
    fn test_positional_mapping_without_header() {
        let rows = vec![
            row(&["Jean", "Dupont", "1234", "2010-01-01", "CM2"]),
            row(&["Awa", "Traore", "AB-12", "01/03/2015", "6eme", "", "A"]),
        ];
        let result = interpret_rows(&rows);
        assert_eq!(result.students.len(), 2);
        assert_eq!(result.students[0].first_name, "Jean");
        assert_eq!(result.students[1].class_name, "6eme A");
    }

    #[test]
    fn test_positional_rows_with_too_few_cells_are_invalid() {
        let rows = vec![row(&["Jean", "Dupont", "1234", "2010-01-01", "CM2"]), row(&["Awa", "Traore"])];
        let result = interpret_rows(&rows);
        assert_eq!(result.students.len(), 1);
        assert_eq!(result.invalid_rows, vec![row(&["Awa", "Traore"])]);
    }

    #[test]
    fn test_blank_rows_are_skipped_and_empty_fields_rejected() {
        let rows = vec![
            row(&["prenom", "nom", "code", "date", "classe"]),
            row(&["", " ", "", "", ""]),
            row(&["Awa", "Traore", "", "01/03/2015", "CM2"]),
            row(&[" Moussa ", " Diallo ", " M-1 ", " 2013-09-09 ", " CM1 "]),
        ];
        let result = interpret_rows(&rows);
        assert_eq!(result.invalid_rows.len(), 1);
        assert_eq!(result.students.len(), 1);
        assert_eq!(result.students[0].first_name, "Moussa");
        assert_eq!(result.students[0].class_name, "CM1");
    }

    #[test]
    fn test_missing_trailing_cells_in_header_mode() {
        let rows = vec![row(&["prenom", "nom", "code", "date", "classe"]), row(&["Awa", "Traore", "AB-12"])];
        let result = interpret_rows(&rows);
        assert!(result.students.is_empty());
        assert_eq!(result.invalid_rows.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(interpret_rows(&[]), Interpretation::default());
    }
}
