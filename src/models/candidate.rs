/// A contact read off one screen, not yet deduplicated or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactCandidate {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
}

impl ContactCandidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            company: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }
}
