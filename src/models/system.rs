upstream_object!(SystemChange {
    asset_id: String,
    asset_type: String,
    asset_name: String,
    change: String,
    description: String,
    time: i64,
});

upstream_object!(SearchItem {
    id: String,
    query: String,
});

upstream_object!(
    /// Saved search; `results` is whatever the upstream attached to it
    SearchResult {
        id: String,
        query: String,
        results: Vec<String>,
    }
);

impl SearchResult {
    /// Placeholder returned when the upstream has no such search
    pub fn empty(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            query: Some(id.to_string()),
            results: Some(Vec::new()),
        }
    }
}

upstream_object!(SearchPost {
    id: String,
    post_type: String,
    post_created: i64,
    post_link: String,
    text: String,
    text_highlight: String,
});
