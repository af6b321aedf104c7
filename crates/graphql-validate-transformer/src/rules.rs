use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ValidationType {
    Gt,
    Lt,
    Gte,
    Lte,
    MinLength,
    MaxLength,
    StartsWith,
    EndsWith,
    Matches,
}

impl ValidationType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValidationType::Gt | ValidationType::Lt | ValidationType::Gte | ValidationType::Lte)
    }
}

/// One validation of one field, checked against the mutation input before the data load.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub field_name: String,
    pub kind: ValidationType,
    pub value: String,
    pub error_message: Option<String>,
}

impl Validation {
    /// Check that `value` makes sense for the validation type.
    pub fn check_value(&self) -> Result<(), String> {
        let Validation { kind, value, .. } = self;
        let valid = match kind {
            ValidationType::Gt | ValidationType::Lt | ValidationType::Gte | ValidationType::Lte => {
                value.parse::<f64>().is_ok_and(f64::is_finite)
            }
            ValidationType::MinLength | ValidationType::MaxLength => value.parse::<u32>().is_ok(),
            ValidationType::StartsWith | ValidationType::EndsWith => !value.is_empty(),
            ValidationType::Matches => Regex::new(value).is_ok(),
        };

        if valid {
            Ok(())
        } else {
            Err(format!("{value} is not a valid value for a {kind} validation of {}.", self.field_name))
        }
    }

    fn default_message(&self) -> String {
        let Validation { field_name, value, .. } = self;
        match self.kind {
            ValidationType::Gt => format!("{field_name} must be greater than {value}"),
            ValidationType::Lt => format!("{field_name} must be less than {value}"),
            ValidationType::Gte => format!("{field_name} must be greater than or equal to {value}"),
            ValidationType::Lte => format!("{field_name} must be less than or equal to {value}"),
            ValidationType::MinLength => format!("{field_name} must have a minimum length of {value}"),
            ValidationType::MaxLength => format!("{field_name} must have a maximum length of {value}"),
            ValidationType::StartsWith => format!("{field_name} must start with {value}"),
            ValidationType::EndsWith => format!("{field_name} must end with {value}"),
            ValidationType::Matches => format!("{field_name} must match regular expression {value}"),
        }
    }

    /// The VTL condition under which the input value `$value` fails.
    fn failure_condition(&self) -> String {
        let value = &self.value;
        match self.kind {
            ValidationType::Gt => format!("$value <= {value}"),
            ValidationType::Lt => format!("$value >= {value}"),
            ValidationType::Gte => format!("$value < {value}"),
            ValidationType::Lte => format!("$value > {value}"),
            ValidationType::MinLength => format!("$value.length() < {value}"),
            ValidationType::MaxLength => format!("$value.length() > {value}"),
            ValidationType::StartsWith => format!("!$value.startsWith({})", literal(value)),
            ValidationType::EndsWith => format!("!$value.endsWith({})", literal(value)),
            ValidationType::Matches => format!("!$util.matches({}, $value)", literal(value)),
        }
    }
}

/// A single quoted VTL string, which is never interpolated.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The `preDataLoad` template checking every validation against `$ctx.args.input`.
pub fn validation_request(validations: &[Validation]) -> String {
    let mut request = String::new();
    for validation in validations {
        let message = validation
            .error_message
            .clone()
            .unwrap_or_else(|| validation.default_message());
        request.push_str(&format!(
            "#set( $value = $ctx.args.input.{field} )\n\
             #if( !$util.isNull($value) && {condition} )\n  \
             $util.error({message}, 'ValidationError')\n\
             #end\n",
            field = validation.field_name,
            condition = validation.failure_condition(),
            message = literal(&message),
        ));
    }
    request.push_str("$util.toJson({})\n");
    request
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn validation(kind: ValidationType, value: &str) -> Validation {
        Validation {
            field_name: "title".to_owned(),
            kind,
            value: value.to_owned(),
            error_message: None,
        }
    }

    #[rstest]
    #[case::gt(ValidationType::Gt, "0", true)]
    #[case::gt_text(ValidationType::Gt, "zero", false)]
    #[case::min_length(ValidationType::MinLength, "5", true)]
    #[case::negative_length(ValidationType::MaxLength, "-1", false)]
    #[case::matches(ValidationType::Matches, "^[a-z]+$", true)]
    #[case::broken_regex(ValidationType::Matches, "([a-z]", false)]
    #[case::empty_prefix(ValidationType::StartsWith, "", false)]
    fn values(#[case] kind: ValidationType, #[case] value: &str, #[case] valid: bool) {
        assert_eq!(validation(kind, value).check_value().is_ok(), valid);
    }

    #[test]
    fn request_checks_present_values_only() {
        let request = validation_request(&[
            validation(ValidationType::MinLength, "5"),
            Validation {
                error_message: Some("Titles can't start with test".to_owned()),
                ..validation(ValidationType::StartsWith, "x")
            },
        ]);

        assert_eq!(
            request,
            "#set( $value = $ctx.args.input.title )\n#if( !$util.isNull($value) && $value.length() < 5 )\n  $util.error('title must have a minimum length of 5', 'ValidationError')\n#end\n\
             #set( $value = $ctx.args.input.title )\n#if( !$util.isNull($value) && !$value.startsWith('x') )\n  $util.error('Titles can''t start with test', 'ValidationError')\n#end\n\
             $util.toJson({})\n"
        );
    }
}
