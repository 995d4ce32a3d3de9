/// Skip/limit window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_sql(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(skip) = self.skip.filter(|skip| *skip > 0) {
            clauses.push(format!("OFFSET {}", skip));
        }

        clauses.join(" ")
    }
}
