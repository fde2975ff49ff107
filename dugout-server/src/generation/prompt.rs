//! Prompt template for record summaries

use dugout_common::GenerationRequest;

/// Build the fixed summary prompt from a request's display fields
pub fn build_prompt(request: &GenerationRequest) -> String {
    let year = request
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let age = request
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let bats = if request.bats.trim().is_empty() {
        "unknown"
    } else {
        request.bats.trim()
    };

    format!(
        "Generate a brief description of the baseball player {name} based on the following stats:\n\
         Year: {year}\n\
         Hits: {hits}\n\
         Age: {age}\n\
         Bats: {bats}\n\
         Please provide a concise summary of their performance and any notable achievements.",
        name = request.name,
        year = year,
        hits = request.hits,
        age = age,
        bats = bats,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request() -> GenerationRequest {
        GenerationRequest {
            id: Uuid::nil(),
            name: "Ichiro Suzuki".to_string(),
            year: Some(2004),
            hits: 262,
            age: Some(30),
            bats: "L".to_string(),
        }
    }

    #[test]
    fn prompt_contains_all_stats() {
        let prompt = build_prompt(&request());

        assert!(prompt.starts_with("Generate a brief description of the baseball player Ichiro Suzuki"));
        assert!(prompt.contains("\nYear: 2004\n"));
        assert!(prompt.contains("\nHits: 262\n"));
        assert!(prompt.contains("\nAge: 30\n"));
        assert!(prompt.contains("\nBats: L\n"));
        assert!(prompt.ends_with("notable achievements."));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt(&request()), build_prompt(&request()));
    }

    #[test]
    fn missing_values_render_unknown() {
        let mut req = request();
        req.year = None;
        req.age = None;
        req.bats = String::new();

        let prompt = build_prompt(&req);
        assert!(prompt.contains("Year: unknown"));
        assert!(prompt.contains("Age: unknown"));
        assert!(prompt.contains("Bats: unknown"));
    }
}
