use expdj_kernel::database::models::ExperimentTemplate;
use expdj_kernel::forms::{FormData, FormErrors};
use serde::Serialize;

const NAME_MAX_LEN: usize = 200;

/// Editable fields of an installed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateForm {
    pub name: String,
    pub publish: bool,
    pub reference: Option<String>,
    pub time: Option<i64>,
}

impl TemplateForm {
    /// # Errors
    /// Field errors for a blank or overlong name and a non-positive time.
    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let name = data.required_text("name", NAME_MAX_LEN, &mut errors);
        let time = data.positive_int("time", &mut errors);

        match name {
            Some(name) if errors.is_empty() => Ok(Self {
                name,
                publish: data.flag("publish"),
                reference: data.text("reference"),
                time,
            }),
            _ => Err(errors),
        }
    }

    pub fn apply(self, template: &mut ExperimentTemplate) {
        template.name = self.name;
        template.publish = self.publish;
        template.reference = self.reference;
        template.time = self.time;
    }
}

impl From<&ExperimentTemplate> for TemplateForm {
    fn from(template: &ExperimentTemplate) -> Self {
        Self {
            name: template.name.clone(),
            publish: template.publish,
            reference: template.reference.clone(),
            time: template.time,
        }
    }
}
