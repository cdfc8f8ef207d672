use crate::*;
use std::collections::BTreeMap;

/// A survey store
pub trait Store {
    /// Get a survey by address
    fn get_survey(&self, address: &Address) -> Option<&Survey>;

    /// Get a survey by address for mutation
    fn get_survey_mut(&mut self, address: &Address) -> Option<&mut Survey>;

    /// Insert or replace a survey
    fn set_survey(&mut self, survey: Survey);

    /// Addresses of all stored surveys
    fn addresses(&self) -> Vec<Address>;

    /// Get a survey, failing if nothing is deployed at `address`
    fn survey(&self, address: &Address) -> Result<&Survey, LedgerError> {
        self.get_survey(address)
            .ok_or(LedgerError::UnknownSurvey(*address))
    }

    /// Number of surveys deployed by `admin`
    fn deployments_by(&self, admin: &Address) -> u64 {
        self.addresses()
            .iter()
            .filter_map(|address| self.get_survey(address))
            .filter(|survey| survey.admin() == admin)
            .count() as u64
    }
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct MemStore {
    inner: BTreeMap<Address, Survey>,
}

impl MemStore {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Survey> {
        self.inner.values()
    }
}

impl Store for MemStore {
    fn get_survey(&self, address: &Address) -> Option<&Survey> {
        self.inner.get(address)
    }

    fn get_survey_mut(&mut self, address: &Address) -> Option<&mut Survey> {
        self.inner.get_mut(address)
    }

    fn set_survey(&mut self, survey: Survey) {
        self.inner.insert(*survey.address(), survey);
    }

    fn addresses(&self) -> Vec<Address> {
        self.inner.keys().copied().collect()
    }
}

impl From<Vec<Survey>> for MemStore {
    fn from(item: Vec<Survey>) -> Self {
        let mut memstore = MemStore::default();
        for survey in item {
            memstore.set_survey(survey);
        }
        memstore
    }
}
