//! Prompt construction for record extraction

/// Builds the prompt for analysing one chunk
pub struct PromptBuilder<'a> {
    text: &'a str,
    context_label: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a prompt builder for a chunk
    pub fn new(text: &'a str, context_label: &'a str) -> Self {
        Self {
            text,
            context_label,
        }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(self.text.len() + RECORD_SCHEMA.len() + 2048);

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("Document: {}\n\n", self.context_label));

        prompt.push_str("=== DOCUMENT CONTENT ===\n");
        prompt.push_str(self.text);
        prompt.push_str("\n=== END DOCUMENT ===\n\n");

        prompt.push_str("Return a single JSON object with this shape:\n");
        prompt.push_str(RECORD_SCHEMA);
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"You are analysing one part of an RFP or tender document.
Extract what this part states into the JSON shape below.

Rules:
1. Only report amounts that are written in the document. Never compute the
   bid value from the EMD or the EMD from the bid value.
2. The EMD (earnest money deposit) is a small security deposit; the bid value
   is the whole contract value. They are never the same amount.
3. Every product, item or line of a BOQ/BOM/schedule of items goes into
   productMapping.miiProductStatus, one entry per item.
4. Leave out fields this part does not mention instead of writing "N/A".
5. Prefer the latest corrigendum when it contradicts earlier text."#;

/// JSON shape the model is asked to fill
pub const RECORD_SCHEMA: &str = r#"{
  "projectOverview": {
    "projectName": "string",
    "client": "string",
    "tenderId": "string",
    "bidValue": "string",
    "emd": "string",
    "completionPeriod": "string",
    "lastSubmissionDate": "string"
  },
  "bidManagement": { "keyDeadlines": ["string"], "submissionRequirements": ["string"] },
  "technical": { "scopeOfWork": "string", "keySpecifications": ["string"] },
  "commercial": { "paymentTerms": "string", "warranties": "string" },
  "finance": { "financialRequirements": ["string"], "bankGuarantees": "string" },
  "legal": { "contractClauses": ["string"], "penalties": "string" },
  "scm": { "deliverySchedule": "string", "supplierRequirements": ["string"] },
  "productMapping": {
    "sourceType": "string (BOQ, BOM, Schedule of Items)",
    "miiProductStatus": [
      {
        "productName": "string",
        "category": "string",
        "specifications": "string",
        "quantity": "string",
        "unit": "string",
        "oem": "string, 'Unspecified' when not named",
        "model": "string",
        "miiStatus": "Pending Classification"
      }
    ]
  }
}"#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Respond with the JSON object only. No explanation, no markdown.";
