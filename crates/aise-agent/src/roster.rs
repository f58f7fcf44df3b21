use crate::agent::{Agent, Outbox};
use crate::business_analyst::BusinessAnalystAgent;
use crate::developer::DeveloperAgent;
use crate::generator::TextGenerator;
use std::sync::Arc;

/// Build the default delivery team for a pool of `pool_size` agents.
///
/// The roster holds one business analyst (`ba1`) followed by developers
/// `dev1..` filling the rest of the pool. Developers share `outbox` when one
/// is given.
pub fn default_roster(
    pool_size: usize,
    generator: Arc<dyn TextGenerator>,
    outbox: Option<Arc<dyn Outbox>>,
) -> Vec<Arc<dyn Agent>> {
    if pool_size == 0 {
        return Vec::new();
    }

    let mut roster: Vec<Arc<dyn Agent>> = Vec::with_capacity(pool_size);
    roster.push(Arc::new(BusinessAnalystAgent::new("ba1", generator.clone())));

    for n in 1..pool_size {
        let mut developer = DeveloperAgent::new(format!("dev{n}"), generator.clone());
        if let Some(outbox) = &outbox {
            developer = developer.with_outbox(outbox.clone());
        }
        roster.push(Arc::new(developer));
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::PlaceholderGenerator;
    use aise_core::AgentType;

    #[test]
    fn test_default_roster_layout() {
        let roster = default_roster(3, Arc::new(PlaceholderGenerator::default()), None);
        let ids: Vec<&str> = roster.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["ba1", "dev1", "dev2"]);
        assert_eq!(roster[0].agent_type(), AgentType::BusinessAnalyst);
        assert_eq!(roster[2].agent_type(), AgentType::Developer);
    }

    #[test]
    fn test_single_slot_is_analyst_only() {
        let roster = default_roster(1, Arc::new(PlaceholderGenerator::default()), None);
        assert_eq!(roster.len(), 1);
        assert!(default_roster(0, Arc::new(PlaceholderGenerator::default()), None).is_empty());
    }

    #[test]
    fn test_capabilities_are_ordered() {
        let roster = default_roster(2, Arc::new(PlaceholderGenerator::default()), None);
        assert_eq!(roster[0].capabilities()[0], "requirement_analysis");
        assert_eq!(roster[1].capabilities()[0], "code_generation");
    }
}
