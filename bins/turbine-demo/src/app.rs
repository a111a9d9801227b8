use std::sync::Arc;

use turbine_api::{
    App, BoxFuture, Function, Record, RecordWithError, RecordsWithErrors, ResourceConfigs, Turbine,
    TurbineError,
};

/// Reads user activity, masks customer emails, archives the result.
pub struct DemoApp {
    /// Environment secrets registered before processing.
    pub secrets: Vec<String>,
}

impl App for DemoApp {
    fn run<'a>(&'a self, turbine: &'a mut dyn Turbine) -> BoxFuture<'a, Result<(), TurbineError>> {
        Box::pin(async move {
            let source = turbine.resources("demopg").await?;
            let records = source
                .records("user_activity", ResourceConfigs::new())
                .await?;
            tracing::info!(records = records.len(), stream = %records.stream, "read user activity");

            for name in &self.secrets {
                turbine.register_secret(name).await?;
            }

            let (anonymized, failed) = turbine.process(records, Arc::new(Anonymize)).await?;
            for f in &failed {
                tracing::warn!(key = %f.record.key, error = %f.error, "record dropped");
            }

            let archive = turbine.resources("s3").await?;
            archive
                .write(&anonymized, "user_activity_enriched", ResourceConfigs::new())
                .await?;
            Ok(())
        })
    }
}

pub struct Anonymize;

impl Function for Anonymize {
    fn name(&self) -> &str {
        "Anonymize"
    }

    fn process(&self, records: Vec<Record>) -> (Vec<Record>, RecordsWithErrors) {
        let mut out = Vec::with_capacity(records.len());
        let mut failed = Vec::new();

        for mut record in records {
            let Some(email) = record.payload.get("customer_email") else {
                out.push(record);
                continue;
            };
            let masked = mask_email(email.as_str().unwrap_or_default());
            match record.payload.set("customer_email", masked) {
                Ok(()) => out.push(record),
                Err(e) => failed.push(RecordWithError::new(record, e)),
            }
        }
        (out, failed)
    }
}

/// `jane@example.com` -> `j***@example.com`.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "***".to_owned(),
    }
}
