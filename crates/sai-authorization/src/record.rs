//! Shared helpers for the write-once authorization and grant records

use sai_core::{AccessModes, Graph, ResourceId, Result, SaiError, Session, Value};
use sai_resources::{content_address, ImmutableResource};

use crate::scope::ScopeKind;

pub(crate) fn read_modes(graph: &Graph, term: &str) -> Result<AccessModes> {
    AccessModes::from_terms(graph.values(term).iter().filter_map(Value::as_str))
}

pub(crate) fn write_modes(graph: &mut Graph, term: &str, modes: &AccessModes) -> Result<()> {
    let nodes = modes
        .terms()
        .into_iter()
        .map(ResourceId::parse)
        .collect::<Result<Vec<_>>>()?;
    graph.set_nodes(term, nodes.iter());
    Ok(())
}

pub(crate) fn write_scope(graph: &mut Graph, term: &str, kind: ScopeKind) -> Result<()> {
    graph.set(term, ResourceId::parse(kind.term())?);
    Ok(())
}

/// Address `graph` inside `container` and re-subject it there
pub(crate) fn address(
    container: &ResourceId,
    mut graph: Graph,
    discriminator: &str,
) -> Result<(ResourceId, Graph)> {
    let id = content_address(container, &graph, discriminator.as_bytes())?;
    graph.set_id(id.clone());
    Ok((id, graph))
}

/// Write a freshly built record at its content address.
///
/// Records decoded from the store carry no discriminator and cannot be
/// written again.
pub(crate) async fn persist(
    session: &Session,
    id: &ResourceId,
    graph: Graph,
    discriminator: Option<&str>,
) -> Result<()> {
    let discriminator = discriminator.ok_or_else(|| {
        SaiError::invalid(format!("{id} was read from the store and is already persisted"))
    })?;
    let container = id
        .parent_container()
        .ok_or_else(|| SaiError::invalid(format!("{id} has no parent container")))?;
    let record = ImmutableResource::create(session, &container, graph, discriminator.as_bytes())
        .await?;
    if record.id() != id {
        return Err(SaiError::invalid(format!(
            "content of {id} changed after it was addressed (now {})",
            record.id()
        )));
    }
    Ok(())
}
