use serde::Serialize;
use serde_json::Value;

use crate::coalesce::{first_number, first_present, first_str, pick_array, rank_value};
use crate::shape::{unwrap_envelope, Section};

/// A functional area (department) ranked by headcount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_level: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_count: Option<Value>,
    pub top_tech: Vec<Value>,
}

fn department_row(d: &Value) -> Option<DepartmentRow> {
    let name = first_str(d, &["name", "departmentName", "functionName"]).filter(|s| !s.is_empty())?;
    let technologies = d.get("technologies").and_then(Value::as_array);
    Some(DepartmentRow {
        name,
        employees: first_number(d, &["employeeCount", "headcount"]),
        spending_level: first_present(d, &["spendingLevel", "spendLevel"]).cloned(),
        tech_count: match technologies {
            Some(t) => Some(Value::from(t.len())),
            None => first_number(d, &["technologyCount"]),
        },
        top_tech: technologies
            .map(|t| t.iter().take(3).cloned().collect())
            .unwrap_or_default(),
    })
}

pub fn compact_fai(input: &Value, top_n: usize) -> Section<Vec<DepartmentRow>> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };

    let mut rows: Vec<DepartmentRow> = pick_array(data, &["departments", "teams", "functionalAreas"])
        .iter()
        .filter_map(department_row)
        .collect();
    rows.sort_by(|a, b| rank_value(b.employees.as_ref()).total_cmp(&rank_value(a.employees.as_ref())));
    rows.truncate(top_n);
    Section::Ready(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ranks_by_headcount_and_drops_unnamed() {
        let input = json!({"teams": [
            {"name": "Sales", "employeeCount": 40, "spendingLevel": "High",
             "technologies": ["Salesforce", "Gong", "Outreach", "Zoom"]},
            {"departmentName": "Engineering", "headcount": 300, "technologyCount": 57},
            {"employeeCount": 999},
            {"functionName": "Legal"},
            {"name": "Marketing", "employeeCount": 60, "spendLevel": "Medium"},
            {"name": "Finance", "employeeCount": 20}
        ]});
        let Section::Ready(rows) = compact_fai(&input, 4) else {
            panic!("expected ready");
        };
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Engineering", "Marketing", "Sales", "Finance"]);
        assert_eq!(rows[0].tech_count, Some(json!(57)));
        assert!(rows[0].top_tech.is_empty());
        assert_eq!(rows[2].tech_count, Some(json!(4)));
        assert_eq!(rows[2].top_tech.len(), 3);
        assert_eq!(rows[1].spending_level, Some(json!("Medium")));
    }

    #[test]
    fn missing_headcount_sorts_last_but_is_not_zeroed() {
        let input = json!({"departments": [{"name": "Ops"}, {"name": "IT", "employeeCount": 5}]});
        let out = serde_json::to_value(compact_fai(&input, 4)).unwrap();
        assert_eq!(out[0]["name"], "IT");
        assert!(out[1].get("employees").is_none());
    }

    #[test]
    fn error_passes_through() {
        let out = compact_fai(&json!({"structuredContent": {"error": "boom"}}), 4);
        assert_eq!(serde_json::to_value(out).unwrap(), json!({"error": "boom"}));
    }
}
