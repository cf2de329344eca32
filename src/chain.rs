//! Hub-and-spoke credential chain
//!
//! The caller's ambient identity assumes a hub role, and the hub session assumes the spoke role.
//! A spoke account's trust policy therefore only needs to trust the hub role. Both hops share a
//! session identifier so CloudTrail entries of the two sessions can be correlated.

/// Hop of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Hub,
    Spoke,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hub => f.write_str("hub"),
            Self::Spoke => f.write_str("spoke"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    pub hub: crate::role::RoleDescriptor,
    pub spoke: crate::role::RoleDescriptor,
    /// Sent with both hops; None is forwarded as an empty string.
    pub external_id: Option<String>,
    /// Used verbatim as the session identifier when non-empty; generated otherwise.
    pub session_label: Option<String>,
    /// Lifetime requested for the spoke credentials
    pub duration_seconds: Option<u32>,
}

impl ChainRequest {
    pub fn new(hub: crate::role::RoleDescriptor, spoke: crate::role::RoleDescriptor) -> Self {
        Self {
            hub,
            spoke,
            external_id: None,
            session_label: None,
            duration_seconds: None,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::Error> {
        self.hub.validate("hub")?;
        self.spoke.validate("spoke")?;
        Ok(())
    }

    /// Validate, then take the session label or generate an identifier from `rng`.
    ///
    /// Synchronous so that `rng` is never held across an await point.
    pub fn session<R>(
        &self,
        rng: &mut R,
    ) -> Result<crate::session::SessionIdentifier, crate::error::Error>
    where
        R: rand::Rng + ?Sized,
    {
        self.validate()?;
        Ok(crate::session::SessionIdentifier::from_label_or_generate(
            self.session_label.as_deref(),
            rng,
        ))
    }
}

/// Resolves a [`ChainRequest`] into spoke credentials. Holds no state besides the provider.
pub struct Resolver<P> {
    provider: P,
}

impl<P> Resolver<P>
where
    P: crate::client::AssumeRoleProvider,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn resolve(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &ChainRequest,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<crate::client::Credentials, crate::error::Error> {
        let session = request.session(&mut rand::thread_rng())?;
        self.resolve_with_session(identity, request, &session, cancel)
            .await
    }

    /// Same as [`Self::resolve`], drawing a generated session identifier from `rng`.
    pub async fn resolve_with_rng<R>(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &ChainRequest,
        cancel: &tokio_util::sync::CancellationToken,
        rng: &mut R,
    ) -> Result<crate::client::Credentials, crate::error::Error>
    where
        R: rand::Rng + ?Sized,
    {
        let session = request.session(rng)?;
        self.resolve_with_session(identity, request, &session, cancel)
            .await
    }

    async fn resolve_with_session(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &ChainRequest,
        session: &crate::session::SessionIdentifier,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<crate::client::Credentials, crate::error::Error> {
        let external_id = request.external_id.clone().unwrap_or_default();

        let hub_arn = request.hub.role_arn();
        let hub_request = crate::client::AssumeRoleRequest {
            role_arn: hub_arn.clone(),
            role_session_name: session.to_string(),
            external_id: external_id.clone(),
            duration_seconds: None,
        };
        let hub = self
            .hop(Stage::Hub, identity, &hub_request, cancel)
            .await
            .map_err(|e| match e {
                crate::error::Error::Cancelled(_) => e,
                e => crate::error::Error::HubAssumptionError {
                    role_arn: hub_arn,
                    source: Box::new(e),
                },
            })?;
        let hub_identity = crate::identity::AmbientIdentity::from(&hub.credentials);

        let spoke_arn = request.spoke.role_arn();
        let spoke_request = crate::client::AssumeRoleRequest {
            role_arn: spoke_arn.clone(),
            role_session_name: session.spoke_session_name(request.spoke.account_id()),
            external_id,
            duration_seconds: request.duration_seconds,
        };
        let spoke = self
            .hop(Stage::Spoke, &hub_identity, &spoke_request, cancel)
            .await
            .map_err(|e| match e {
                crate::error::Error::Cancelled(_) => e,
                e => crate::error::Error::SpokeAssumptionError {
                    role_arn: spoke_arn,
                    account_id: request.spoke.account_id().to_owned(),
                    source: Box::new(e),
                },
            })?;

        Ok(spoke.credentials)
    }

    /// A single provider call. Never started once `cancel` has fired, and abandoned if it fires
    /// while in flight.
    async fn hop(
        &self,
        stage: Stage,
        identity: &crate::identity::AmbientIdentity,
        request: &crate::client::AssumeRoleRequest,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<crate::client::AssumeRoleResponse, crate::error::Error> {
        if cancel.is_cancelled() {
            return Err(crate::error::Error::Cancelled(stage));
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(crate::error::Error::Cancelled(stage)),
            r = self.provider.assume_role(identity, request) => r,
        }
    }
}
