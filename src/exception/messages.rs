//! Message templates of the global handler, per locale

use crate::config::Locale;

impl Locale {
    pub(crate) fn invalid_field(self, field: &str) -> String {
        match self {
            Locale::En => format!("Invalid value in field '{field}'"),
            Locale::Ru => format!("Некорректное значение в поле '{field}'"),
        }
    }

    pub(crate) fn invalid_fields(self, fields: &str) -> String {
        match self {
            Locale::En => format!("Invalid values in fields: {fields}"),
            Locale::Ru => format!("Некорректные значения в полях: {fields}"),
        }
    }

    pub(crate) fn invalid_format(self, path: &str) -> String {
        match self {
            Locale::En => format!("Invalid format of field '{path}'"),
            Locale::Ru => format!("Некорректный формат поля '{path}'"),
        }
    }

    pub(crate) fn wrong_data_type(self, path: &str) -> String {
        match self {
            Locale::En => format!("Wrong data type of field '{path}'"),
            Locale::Ru => format!("Неправильный тип данных поля '{path}'"),
        }
    }

    pub(crate) fn invalid_parameter(self, name: &str, required_type: &str, value: &str) -> String {
        match self {
            Locale::En => format!(
                "Invalid value for parameter '{name}'. Expected type '{required_type}', got value '{value}'."
            ),
            Locale::Ru => format!(
                "Некорректное значение параметра '{name}'. Ожидался тип '{required_type}', получено значение '{value}'."
            ),
        }
    }
}
