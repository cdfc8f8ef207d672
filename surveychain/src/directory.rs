use crate::*;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// A deployed survey as listed in the public directory
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    pub id: String,
    pub title: String,
    pub description: String,

    /// EIP-55 checksummed survey address
    pub address: String,
    pub options: Vec<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub finalized: bool,
    pub options_count: usize,
}

impl SurveyRecord {
    pub fn from_survey(id: &str, description: &str, survey: &Survey) -> Self {
        let info = survey.info();
        SurveyRecord {
            id: id.to_owned(),
            title: info.title,
            description: description.to_owned(),
            address: survey.address().to_checksum(),
            options: survey.options().to_vec(),
            start_time: info.start_time,
            end_time: info.end_time,
            finalized: info.finalized,
            options_count: info.options_count,
        }
    }

    pub fn address(&self) -> Result<Address, Error> {
        Address::from_str(&self.address)
    }
}

/// Survey to deploy as part of a batch
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SurveyDefinition {
    pub title: String,

    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,

    /// Voting window length in seconds
    pub duration: u64,
}

/// Ordered list of deployed surveys, stored as a JSON array
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Directory(Vec<SurveyRecord>);

impl Directory {
    /// Deploy every definition as the caller of `ctx`, numbering records from "1"
    ///
    /// Stops at the first definition the ledger rejects. Surveys deployed before it stay deployed.
    pub fn deploy<B: FheBackend, S: Store>(
        ledger: &mut Ledger<B, S>,
        ctx: &CallContext,
        definitions: &[SurveyDefinition],
    ) -> Result<Self, LedgerError> {
        let mut directory = Directory::default();
        for (i, definition) in definitions.iter().enumerate() {
            let address = ledger.create(
                ctx,
                &definition.title,
                definition.options.clone(),
                definition.duration,
            )?;

            let id = (i + 1).to_string();
            info!("deployed survey {} '{}' at {}", id, definition.title, address);
            directory.push(SurveyRecord::from_survey(
                &id,
                &definition.description,
                ledger.survey(&address)?,
            ));
        }
        Ok(directory)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Directory::from_json(&json)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Parse and validate a directory
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let directory: Directory = serde_json::from_str(json)?;
        directory.validate()?;
        Ok(directory)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the directory is non-empty and every record is well formed
    pub fn validate(&self) -> Result<(), Error> {
        if self.0.is_empty() {
            return Err(Error::InvalidDirectory("no surveys listed".to_owned()));
        }

        let mut ids = HashSet::new();
        for record in &self.0 {
            if !ids.insert(record.id.as_str()) {
                return Err(Error::InvalidDirectory(format!(
                    "duplicate id {}",
                    record.id
                )));
            }
            if !Address::is_checksummed(&record.address) {
                return Err(Error::InvalidDirectory(format!(
                    "survey {} address {} is not checksummed",
                    record.id, record.address
                )));
            }
            if record.options.len() != record.options_count {
                return Err(Error::InvalidDirectory(format!(
                    "survey {} lists {} options but optionsCount is {}",
                    record.id,
                    record.options.len(),
                    record.options_count
                )));
            }
        }
        Ok(())
    }

    pub fn records(&self) -> &[SurveyRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SurveyRecord> {
        self.0.iter().find(|record| record.id == id)
    }

    pub fn find_by_address(&self, address: &Address) -> Option<&SurveyRecord> {
        self.0
            .iter()
            .find(|record| record.address().map_or(false, |a| &a == address))
    }

    pub fn push(&mut self, record: SurveyRecord) {
        self.0.push(record);
    }
}
