//! Vocabulary terms used to read and write registry, authorization and grant documents

/// RDF core terms
pub mod rdf {
    /// Type assertion
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// Linked Data Platform terms
pub mod ldp {
    /// Container membership
    pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
}

/// Dublin Core terms
pub mod dcterms {
    /// Agent that created a data instance
    pub const CREATOR: &str = "http://purl.org/dc/terms/creator";
}

/// Solid terms
pub mod solid {
    /// Identity provider trusted to authenticate a social agent
    pub const OIDC_ISSUER: &str = "http://www.w3.org/ns/solid/terms#oidcIssuer";
}

/// Access control modes
pub mod acl {
    /// Read mode
    pub const READ: &str = "http://www.w3.org/ns/auth/acl#Read";
    /// Create mode
    pub const CREATE: &str = "http://www.w3.org/ns/auth/acl#Create";
    /// Update mode
    pub const UPDATE: &str = "http://www.w3.org/ns/auth/acl#Update";
    /// Delete mode
    pub const DELETE: &str = "http://www.w3.org/ns/auth/acl#Delete";
    /// Legacy write mode: create, update and delete
    pub const WRITE: &str = "http://www.w3.org/ns/auth/acl#Write";
    /// Legacy append mode: create only
    pub const APPEND: &str = "http://www.w3.org/ns/auth/acl#Append";
}

/// Application interoperability terms
pub mod interop {
    macro_rules! terms {
        ($($(#[$doc:meta])* $name:ident = $local:literal;)*) => {
            $($(#[$doc])* pub const $name: &str = concat!("http://www.w3.org/ns/solid/interop#", $local);)*
        };
    }

    terms! {
        // Registry set
        /// Registry set type
        REGISTRY_SET = "RegistrySet";
        /// Link from a registry set to its agent registry
        HAS_AGENT_REGISTRY = "hasAgentRegistry";
        /// Link from a registry set to its authorization registry
        HAS_AUTHORIZATION_REGISTRY = "hasAuthorizationRegistry";
        /// Link from a registry set to a data registry
        HAS_DATA_REGISTRY = "hasDataRegistry";

        // Profiles
        /// Link from a social agent profile to its registry set
        HAS_REGISTRY_SET = "hasRegistrySet";
        /// Link from a social agent profile to its authorization agent
        HAS_AUTHORIZATION_AGENT = "hasAuthorizationAgent";
        /// Link from a social agent profile to its access inbox
        HAS_ACCESS_INBOX = "hasAccessInbox";
        /// Display name of an application
        APPLICATION_NAME = "applicationName";
        /// Description of an application
        APPLICATION_DESCRIPTION = "applicationDescription";
        /// Author of an application
        APPLICATION_AUTHOR = "applicationAuthor";
        /// Logo of an application
        APPLICATION_THUMBNAIL = "applicationThumbnail";

        // Agent registry
        /// Agent registry type
        AGENT_REGISTRY = "AgentRegistry";
        /// Link from an agent registry to a social agent registration
        HAS_SOCIAL_AGENT_REGISTRATION = "hasSocialAgentRegistration";
        /// Link from an agent registry to an application registration
        HAS_APPLICATION_REGISTRATION = "hasApplicationRegistration";
        /// Social agent registration type
        SOCIAL_AGENT_REGISTRATION = "SocialAgentRegistration";
        /// Application registration type
        APPLICATION_REGISTRATION = "ApplicationRegistration";
        /// Agent that created a registration
        REGISTERED_BY = "registeredBy";
        /// Application used to create a registration
        REGISTERED_WITH = "registeredWith";
        /// Creation time of a registration
        REGISTERED_AT = "registeredAt";
        /// Last update time of a registration
        UPDATED_AT = "updatedAt";
        /// Agent a registration describes
        REGISTERED_AGENT = "registeredAgent";
        /// Current access grant issued to the registered agent
        HAS_ACCESS_GRANT = "hasAccessGrant";
        /// Access grants replaced by a newer grant
        HAS_SUPERSEDED_ACCESS_GRANT = "hasSupersededAccessGrant";
        /// Registration the registered agent keeps for the owner
        RECIPROCAL_REGISTRATION = "reciprocalRegistration";

        // Data registry
        /// Data registry type
        DATA_REGISTRY = "DataRegistry";
        /// Link from a data registry or authorization to a data registration
        HAS_DATA_REGISTRATION = "hasDataRegistration";
        /// Data registration type
        DATA_REGISTRATION = "DataRegistration";
        /// Shape tree of the instances in a data registration
        REGISTERED_SHAPE_TREE = "registeredShapeTree";

        // Authorization registry
        /// Authorization registry type
        AUTHORIZATION_REGISTRY = "AuthorizationRegistry";
        /// Link from an authorization registry to an access authorization
        HAS_ACCESS_AUTHORIZATION = "hasAccessAuthorization";

        // Authorizations
        /// Access authorization type
        ACCESS_AUTHORIZATION = "AccessAuthorization";
        /// Data authorization type
        DATA_AUTHORIZATION = "DataAuthorization";
        /// Social agent that issued an authorization or grant
        GRANTED_BY = "grantedBy";
        /// Application used to issue an authorization
        GRANTED_WITH = "grantedWith";
        /// Issuance time
        GRANTED_AT = "grantedAt";
        /// Agent receiving access
        GRANTEE = "grantee";
        /// Access need group satisfied by an authorization or grant
        HAS_ACCESS_NEED_GROUP = "hasAccessNeedGroup";
        /// Access need satisfied by a data authorization or grant
        SATISFIES_ACCESS_NEED = "satisfiesAccessNeed";
        /// Authorization replaced by this one
        REPLACES = "replaces";
        /// Link from an access authorization to a data authorization
        HAS_DATA_AUTHORIZATION = "hasDataAuthorization";
        /// Owner of the data being shared
        DATA_OWNER = "dataOwner";
        /// Granted access mode
        ACCESS_MODE = "accessMode";
        /// Access mode granted on instances the grantee created
        CREATOR_ACCESS_MODE = "creatorAccessMode";
        /// Scope kind of a data authorization
        SCOPE_OF_AUTHORIZATION = "scopeOfAuthorization";
        /// Explicitly selected data instance
        HAS_DATA_INSTANCE = "hasDataInstance";
        /// Parent data authorization
        INHERITS_FROM_AUTHORIZATION = "inheritsFromAuthorization";
        /// Missing selected instances are skipped during resolution
        TOLERATE_MISSING_INSTANCES = "tolerateMissingInstances";

        // Grants
        /// Access grant type
        ACCESS_GRANT = "AccessGrant";
        /// Data grant type
        DATA_GRANT = "DataGrant";
        /// Link from an access grant to a data grant
        HAS_DATA_GRANT = "hasDataGrant";
        /// Authorization an access grant was resolved from
        HAS_ACCESS_AUTHORIZATION_SOURCE = "resolvedFromAuthorization";
        /// Scope kind of a data grant
        SCOPE_OF_GRANT = "scopeOfGrant";
        /// Parent data grant
        INHERITS_FROM_GRANT = "inheritsFromGrant";
        /// Remote data grant a delegated grant derives from
        DELEGATION_OF_GRANT = "delegationOfGrant";

        // Scopes
        /// Every instance of a data registration
        ALL_FROM_REGISTRY = "AllFromRegistry";
        /// Listed instances of a data registration
        SELECTED_FROM_REGISTRY = "SelectedFromRegistry";
        /// Scope delegated by another social agent
        ALL_FROM_AGENT = "AllFromAgent";
        /// Children of a parent grant's instances
        INHERITED = "Inherited";
    }
}
