//! Chassis Resolution
//!
//! BMCs disagree about which chassis carries what. [`ResourceLocator`] hides
//! that behind four entry points:
//!
//! - [`ResourceLocator::primary`] - the chassis with the well-known id `"1"`
//! - [`ResourceLocator::by_id`] - any chassis by id
//! - [`ResourceLocator::all`] - every chassis that could be read
//! - [`ResourceLocator::power_fallback`] - first non-denylisted chassis with
//!   usable power supply data
//!
//! `primary` and `by_id` report every failure as `NotFound`, keeping the
//! underlying cause in the message. Member reads that fail are tolerated as
//! long as at least one member of the collection could be read. Nothing here
//! is cached; every scrape resolves chassis afresh.

use crate::error::{ExporterError, Result};
use crate::redfish::session::Session;
use crate::redfish::types::{Chassis, Collection, Power, Thermal, CHASSIS};
use tracing::debug;

/// Id most BMCs give their main enclosure
pub const PRIMARY_CHASSIS_ID: &str = "1";

/// Chassis known to answer power queries with garbage or hang
pub const CHASSIS_DENYLIST: &[&str] = &["NVMeSSD.0.Group.0.StorageBackplane"];

/// A resolved chassis plus access to its thermal and power sub-resources
#[derive(Debug, Clone)]
pub struct ChassisRef {
    pub chassis: Chassis,
}

impl ChassisRef {
    pub fn id(&self) -> &str {
        &self.chassis.id
    }

    pub async fn thermal(&self, session: &Session) -> Result<Thermal> {
        let link = self.chassis.thermal.as_ref().ok_or_else(|| {
            ExporterError::NotFound(format!("chassis {} has no Thermal resource", self.id()))
        })?;
        session.call(&link.odata_id).await
    }

    pub async fn power(&self, session: &Session) -> Result<Power> {
        let link = self.chassis.power.as_ref().ok_or_else(|| {
            ExporterError::NotFound(format!("chassis {} has no Power resource", self.id()))
        })?;
        session.call(&link.odata_id).await
    }
}

pub fn is_denylisted(id: &str) -> bool {
    CHASSIS_DENYLIST.iter().any(|denied| *denied == id)
}

pub struct ResourceLocator<'a> {
    session: &'a Session,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// The chassis with id `"1"`
    pub async fn primary(&self) -> Result<ChassisRef> {
        self.find(PRIMARY_CHASSIS_ID).await
    }

    pub async fn by_id(&self, id: &str) -> Result<ChassisRef> {
        if id == PRIMARY_CHASSIS_ID {
            return self.primary().await;
        }
        self.find(id).await
    }

    /// Every chassis that could be read, in collection order
    pub async fn all(&self) -> Result<Vec<ChassisRef>> {
        let collection: Collection = self.session.call(CHASSIS).await?;
        let requested = collection.members.len();

        let mut found = Vec::with_capacity(requested);
        for member in &collection.members {
            match self.session.call::<Chassis>(&member.odata_id).await {
                Ok(chassis) => found.push(ChassisRef { chassis }),
                Err(e) => debug!(
                    bmc = %self.session.target(),
                    chassis = %member.odata_id,
                    error = %e,
                    "Failed to read chassis member"
                ),
            }
        }

        if found.len() < requested {
            if found.is_empty() {
                return Err(ExporterError::PartialResult {
                    retrieved: 0,
                    requested,
                });
            }
            debug!(
                bmc = %self.session.target(),
                "Continuing with {} of {} chassis",
                found.len(),
                requested
            );
        }

        Ok(found)
    }

    async fn find(&self, id: &str) -> Result<ChassisRef> {
        let chassis = self.all().await.map_err(|e| {
            ExporterError::NotFound(format!("no chassis list could be obtained: {}", e))
        })?;
        if chassis.is_empty() {
            return Err(ExporterError::NotFound("no chassis found".to_string()));
        }
        chassis
            .into_iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| ExporterError::NotFound(format!("chassis with ID {} not found", id)))
    }

    /// Scan every chassis outside the denylist, in order, and return the
    /// first whose power resource has at least one item `usable` accepts.
    pub async fn power_fallback<F>(&self, usable: F) -> Result<(ChassisRef, Power)>
    where
        F: Fn(&Power) -> usize,
    {
        let candidates = self.all().await?;

        for chassis in candidates {
            if is_denylisted(chassis.id()) {
                debug!(chassis = %chassis.id(), "Skipping known problematic chassis");
                continue;
            }

            let power = match chassis.power(self.session).await {
                Ok(power) => power,
                Err(e) => {
                    debug!(
                        chassis = %chassis.id(),
                        error = %e,
                        "Failed to get power information"
                    );
                    continue;
                }
            };

            if usable(&power) > 0 {
                debug!(
                    chassis = %chassis.id(),
                    "Successfully retrieved power information"
                );
                return Ok((chassis, power));
            }
        }

        Err(ExporterError::NotFound(
            "could not find any chassis with power supply information".to_string(),
        ))
    }
}
