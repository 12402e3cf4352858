//! In-memory [Cloud] used to exercise provisioning without a provider.

use crate::cloud::{Cloud, CloudError, ErrorKind, IngressRule, Instance, InstanceState, LaunchSpec};
use std::{collections::HashMap, sync::Mutex};

/// Number of times each operation was invoked
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub describe_network: usize,
    pub create_group: usize,
    pub find_group: usize,
    pub authorize: usize,
    pub create_instance: usize,
    pub describe_instance: usize,
    pub enable_monitoring: usize,
}

/// A group stored by the fake
#[derive(Clone, Debug)]
pub struct Group {
    pub id: String,
    pub rules: Vec<IngressRule>,
}

/// An instance stored by the fake
#[derive(Clone, Debug)]
pub struct Launched {
    pub id: String,
    pub tag: String,
    pub user_data: String,
    pub group_id: String,
}

#[derive(Default)]
pub(crate) struct State {
    calls: Calls,
    groups: HashMap<(String, String), Group>,
    instances: Vec<Launched>,
    describes: HashMap<String, usize>,
}

/// Fake cloud whose behavior is configured through public fields before use.
pub struct Fake {
    /// Identifier returned for the default network
    pub network: Option<String>,

    /// Identifiers handed out (in order) to created groups
    pub group_ids: Vec<String>,

    /// Identifiers handed out (in order) to created instances
    pub instance_ids: Vec<String>,

    /// Number of describes that report the instance as not found
    pub invisible_polls: usize,

    /// Number of describes (after the invisible ones) that report `pending`
    pub pending_polls: usize,

    /// State reported once `pending_polls` describes have elapsed
    pub settled_state: InstanceState,

    /// Public address reported once running
    pub ip: Option<String>,

    /// Forced failures
    pub create_group_error: Option<CloudError>,
    pub authorize_error: Option<CloudError>,
    pub create_instance_error: Option<CloudError>,
    pub monitoring_error: Option<CloudError>,

    pub(crate) state: Mutex<State>,
}

impl Default for Fake {
    fn default() -> Self {
        Self {
            network: Some("vpc-001".to_string()),
            group_ids: vec!["sg-001".to_string(), "sg-002".to_string()],
            instance_ids: vec!["i-001".to_string(), "i-002".to_string()],
            invisible_polls: 0,
            pending_polls: 0,
            settled_state: InstanceState::Running,
            ip: Some("203.0.113.5".to_string()),
            create_group_error: None,
            authorize_error: None,
            create_instance_error: None,
            monitoring_error: None,
            state: Mutex::new(State::default()),
        }
    }
}

impl Fake {
    /// Seeds a pre-existing group so that creating `name` in `network` reports a duplicate.
    pub fn with_group(self, network: &str, name: &str, id: &str) -> Self {
        self.state.lock().unwrap().groups.insert(
            (network.to_string(), name.to_string()),
            Group {
                id: id.to_string(),
                rules: Vec::new(),
            },
        );
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn group(&self, network: &str, name: &str) -> Option<Group> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(&(network.to_string(), name.to_string()))
            .cloned()
    }

    pub fn groups(&self) -> usize {
        self.state.lock().unwrap().groups.len()
    }

    pub fn instances(&self) -> Vec<Launched> {
        self.state.lock().unwrap().instances.clone()
    }
}

impl Cloud for Fake {
    async fn describe_default_network(&self) -> Result<Option<String>, CloudError> {
        self.state.lock().unwrap().calls.describe_network += 1;
        Ok(self.network.clone())
    }

    async fn create_security_group(
        &self,
        network: &str,
        name: &str,
        _description: &str,
    ) -> Result<String, CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_group += 1;
        if let Some(err) = &self.create_group_error {
            return Err(err.clone());
        }
        let key = (network.to_string(), name.to_string());
        if state.groups.contains_key(&key) {
            return Err(CloudError::new(
                ErrorKind::Duplicate,
                format!("security group {name} already exists"),
            ));
        }
        let id = self.group_ids[state.groups.len()].clone();
        state.groups.insert(
            key,
            Group {
                id: id.clone(),
                rules: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn find_security_group(
        &self,
        network: &str,
        name: &str,
    ) -> Result<Option<String>, CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.find_group += 1;
        Ok(state
            .groups
            .get(&(network.to_string(), name.to_string()))
            .map(|g| g.id.clone()))
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
    ) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.authorize += 1;
        if let Some(err) = &self.authorize_error {
            return Err(err.clone());
        }
        let group = state
            .groups
            .values_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| CloudError::new(ErrorKind::NotFound, group_id))?;
        group.rules.extend_from_slice(rules);
        Ok(())
    }

    async fn create_instance(&self, spec: &LaunchSpec<'_>) -> Result<String, CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_instance += 1;
        if let Some(err) = &self.create_instance_error {
            return Err(err.clone());
        }
        let id = self.instance_ids[state.instances.len()].clone();
        state.instances.push(Launched {
            id: id.clone(),
            tag: spec.tag.to_string(),
            user_data: spec.user_data.to_string(),
            group_id: spec.group_id.to_string(),
        });
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Instance, CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.describe_instance += 1;
        if !state.instances.iter().any(|i| i.id == instance_id) {
            return Err(CloudError::new(ErrorKind::NotFound, instance_id));
        }
        let seen = state.describes.entry(instance_id.to_string()).or_default();
        *seen += 1;
        if *seen <= self.invisible_polls {
            return Err(CloudError::new(ErrorKind::NotFound, instance_id));
        }
        if *seen <= self.invisible_polls.saturating_add(self.pending_polls) {
            return Ok(Instance {
                id: instance_id.to_string(),
                state: InstanceState::Pending,
                public_ip: None,
            });
        }
        let public_ip = match self.settled_state {
            InstanceState::Running => self.ip.clone(),
            _ => None,
        };
        Ok(Instance {
            id: instance_id.to_string(),
            state: self.settled_state,
            public_ip,
        })
    }

    async fn enable_monitoring(&self, _instance_id: &str) -> Result<(), CloudError> {
        self.state.lock().unwrap().calls.enable_monitoring += 1;
        match &self.monitoring_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
