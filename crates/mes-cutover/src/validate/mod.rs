//! Post-run validation: read-only checks against both stores.
//!
//! Nothing here mutates anything or halts anything. Mismatches and
//! orphans are reported for the operator to review alongside the run
//! report; the spot check prints child-record counts for a random
//! handful of serial units as a human sanity check.

use crate::config::MigrationConfig;
use crate::engine::effective_filter;
use crate::error::Result;
use crate::model::{
    Annotation, AnnotationType, Asset, Badge, ChangeLog, Characteristic, CharacteristicLink,
    ControlPlan,
    Counter, DefectCode, DefectLink, DefectLocation, DefectLog, Gear, InspectionLog,
    LineAssignment, MaterialQueueItem, Plant, Product, ProductType, ProductionLine, Schedule,
    SerialUnit, TraceLog, User, Vendor, WeldLog, WorkCenter, WorkOrder,
};
use crate::source::LegacyReader;
use crate::target::{EntityStore, TargetStore};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// One (legacy table, target collection) count reconciliation.
#[derive(Debug, Clone)]
pub struct CountCheck {
    pub table: &'static str,
    pub source_count: i64,
    pub target_count: i64,
    pub ok: bool,
}

/// One referential-integrity scan result.
#[derive(Debug, Clone)]
pub struct OrphanCheck {
    pub relationship: &'static str,
    pub orphan_count: i64,
}

/// Child-record counts for one sampled serial unit.
#[derive(Debug, Clone)]
pub struct SpotCheck {
    pub serial: String,
    pub weld_logs: usize,
    pub trace_logs: usize,
    pub inspection_logs: usize,
    pub defect_logs: usize,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub counts: Vec<CountCheck>,
    pub orphans: Vec<OrphanCheck>,
    pub spot_checks: Vec<SpotCheck>,
}

impl ValidationReport {
    /// No mismatches and no orphans. The spot check never affects this.
    pub fn is_clean(&self) -> bool {
        self.counts.iter().all(|c| c.ok) && self.orphans.iter().all(|o| o.orphan_count == 0)
    }

    pub fn print(&self) {
        println!("\nCount reconciliation:");
        println!(
            "{:<28} {:>10} {:>10}   {}",
            "Table", "Source", "Target", "Status"
        );
        for c in &self.counts {
            println!(
                "{:<28} {:>10} {:>10}   {}",
                c.table,
                c.source_count,
                c.target_count,
                if c.ok { "OK" } else { "MISMATCH" }
            );
        }

        println!("\nReferential integrity:");
        for o in &self.orphans {
            let status = if o.orphan_count == 0 { "OK" } else { "ORPHANS" };
            println!("{:<44} {:>8}   {}", o.relationship, o.orphan_count, status);
        }

        if !self.spot_checks.is_empty() {
            println!("\nSpot check (child records per sampled serial unit):");
            println!(
                "{:<24} {:>6} {:>6} {:>12} {:>8}",
                "Serial", "Weld", "Trace", "Inspection", "Defect"
            );
            for s in &self.spot_checks {
                println!(
                    "{:<24} {:>6} {:>6} {:>12} {:>8}",
                    s.serial, s.weld_logs, s.trace_logs, s.inspection_logs, s.defect_logs
                );
            }
        }
    }
}

/// A target count is acceptable at or above `tolerance * source`.
/// Exact equality is not required; some legacy rows are legitimately
/// skipped.
fn count_ok(source: i64, target: i64, tolerance: f64) -> bool {
    if source <= 0 {
        return true;
    }
    target as f64 >= source as f64 * tolerance
}

/// Run every validation check. Read-only against both stores.
pub async fn validate<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<ValidationReport>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut report = ValidationReport::default();

    count_checks(reader, store, cfg, &mut report.counts).await?;
    orphan_checks(store, &mut report.orphans).await?;
    report.spot_checks = spot_check(store, cfg.spot_check_samples).await?;

    info!(
        mismatches = report.counts.iter().filter(|c| !c.ok).count(),
        orphan_relationships = report
            .orphans
            .iter()
            .filter(|o| o.orphan_count > 0)
            .count(),
        "validation finished"
    );
    Ok(report)
}

async fn count_checks<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
    out: &mut Vec<CountCheck>,
) -> Result<()>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    macro_rules! check {
        ($table:literal, $entity:ty) => {{
            let filter = effective_filter(reader, cfg, $table, None).await?;
            let source_count = reader.count($table, filter.as_ref()).await?;
            let target_count = EntityStore::<$entity>::count(store).await?;
            out.push(CountCheck {
                table: $table,
                source_count,
                target_count,
                ok: count_ok(source_count, target_count, cfg.count_tolerance),
            });
        }};
    }

    check!("Plants", Plant);

    // Gears fan out per plant, so the expected target count is
    // source x plants rather than the raw source count.
    {
        let filter = effective_filter(reader, cfg, "GlobalGears", None).await?;
        let gears = reader.count("GlobalGears", filter.as_ref()).await?;
        let plants = EntityStore::<Plant>::count(store).await?;
        let expected = gears * plants;
        let target_count = EntityStore::<Gear>::count(store).await?;
        out.push(CountCheck {
            table: "GlobalGears",
            source_count: expected,
            target_count,
            ok: count_ok(expected, target_count, cfg.count_tolerance),
        });
    }

    check!("ProductionLines", ProductionLine);
    check!("WorkCenters", WorkCenter);
    check!("Assets", Asset);
    check!("ProductTypes", ProductType);
    check!("Products", Product);
    check!("Users", User);
    check!("Vendors", Vendor);
    check!("AnnotationTypes", AnnotationType);
    check!("Characteristics", Characteristic);
    check!("CharacteristicWorkCenters", CharacteristicLink);
    check!("ControlPlans", ControlPlan);
    check!("DefectCodes", DefectCode);
    check!("DefectLocations", DefectLocation);
    check!("DefectWorkCenters", DefectLink);
    check!("Badges", Badge);
    check!("SerialNumbers", SerialUnit);
    check!("WorkOrders", WorkOrder);
    check!("WeldLogs", WeldLog);
    check!("TraceabilityLogs", TraceLog);
    check!("InspectionLogs", InspectionLog);
    check!("DefectLogs", DefectLog);
    check!("Annotations", Annotation);
    check!("MaterialQueue", MaterialQueueItem);
    check!("ChangeLogs", ChangeLog);
    check!("Counters", Counter);
    check!("Schedules", Schedule);

    Ok(())
}

async fn orphan_checks<T>(store: &T, out: &mut Vec<OrphanCheck>) -> Result<()>
where
    T: TargetStore + ?Sized,
{
    let plants: HashSet<Uuid> = ids(EntityStore::<Plant>::list(store).await?, |p: &Plant| p.id);
    let lines: HashSet<Uuid> = ids(
        EntityStore::<ProductionLine>::list(store).await?,
        |l: &ProductionLine| l.id,
    );
    let work_centers: HashSet<Uuid> = ids(
        EntityStore::<WorkCenter>::list(store).await?,
        |w: &WorkCenter| w.id,
    );
    let users: HashSet<Uuid> = ids(EntityStore::<User>::list(store).await?, |u: &User| u.id);
    let serials: HashSet<Uuid> = ids(
        EntityStore::<SerialUnit>::list(store).await?,
        |s: &SerialUnit| s.id,
    );
    let defect_codes: HashSet<Uuid> = ids(
        EntityStore::<DefectCode>::list(store).await?,
        |d: &DefectCode| d.id,
    );

    out.push(OrphanCheck {
        relationship: "gears -> plants",
        orphan_count: EntityStore::<Gear>::list(store)
            .await?
            .iter()
            .filter(|g| !plants.contains(&g.plant_id))
            .count() as i64,
    });

    let assignments = EntityStore::<LineAssignment>::list(store).await?;
    out.push(OrphanCheck {
        relationship: "line_assignments -> work_centers",
        orphan_count: assignments
            .iter()
            .filter(|a| !work_centers.contains(&a.work_center_id))
            .count() as i64,
    });
    out.push(OrphanCheck {
        relationship: "line_assignments -> production_lines",
        orphan_count: assignments
            .iter()
            .filter(|a| !lines.contains(&a.line_id))
            .count() as i64,
    });

    out.push(OrphanCheck {
        relationship: "badges -> users",
        orphan_count: EntityStore::<Badge>::list(store)
            .await?
            .iter()
            .filter(|b| matches!(b.user_id, Some(u) if !users.contains(&u)))
            .count() as i64,
    });

    out.push(OrphanCheck {
        relationship: "serial_units.replaced_by -> serial_units",
        orphan_count: EntityStore::<SerialUnit>::list(store)
            .await?
            .iter()
            .filter(|s| matches!(s.replaced_by, Some(r) if !serials.contains(&r)))
            .count() as i64,
    });

    out.push(OrphanCheck {
        relationship: "weld_logs -> serial_units",
        orphan_count: EntityStore::<WeldLog>::list(store)
            .await?
            .iter()
            .filter(|l| matches!(l.serial_unit_id, Some(s) if !serials.contains(&s)))
            .count() as i64,
    });

    out.push(OrphanCheck {
        relationship: "inspection_logs -> serial_units",
        orphan_count: EntityStore::<InspectionLog>::list(store)
            .await?
            .iter()
            .filter(|l| matches!(l.serial_unit_id, Some(s) if !serials.contains(&s)))
            .count() as i64,
    });

    let defect_logs = EntityStore::<DefectLog>::list(store).await?;
    out.push(OrphanCheck {
        relationship: "defect_logs -> serial_units",
        orphan_count: defect_logs
            .iter()
            .filter(|l| matches!(l.serial_unit_id, Some(s) if !serials.contains(&s)))
            .count() as i64,
    });
    out.push(OrphanCheck {
        relationship: "defect_logs -> defect_codes",
        orphan_count: defect_logs
            .iter()
            .filter(|l| matches!(l.defect_code_id, Some(d) if !defect_codes.contains(&d)))
            .count() as i64,
    });

    Ok(())
}

fn ids<E, F: Fn(&E) -> Uuid>(entities: Vec<E>, f: F) -> HashSet<Uuid> {
    entities.iter().map(f).collect()
}

async fn spot_check<T>(store: &T, samples: usize) -> Result<Vec<SpotCheck>>
where
    T: TargetStore + ?Sized,
{
    let units: Vec<SerialUnit> = EntityStore::<SerialUnit>::list(store).await?;
    if units.is_empty() || samples == 0 {
        return Ok(Vec::new());
    }

    let weld_logs: Vec<WeldLog> = EntityStore::<WeldLog>::list(store).await?;
    let trace_logs: Vec<TraceLog> = EntityStore::<TraceLog>::list(store).await?;
    let inspection_logs: Vec<InspectionLog> = EntityStore::<InspectionLog>::list(store).await?;
    let defect_logs: Vec<DefectLog> = EntityStore::<DefectLog>::list(store).await?;

    let mut rng = rand::thread_rng();
    let picked = units.choose_multiple(&mut rng, samples);

    Ok(picked
        .map(|unit| SpotCheck {
            serial: unit.serial.clone(),
            weld_logs: weld_logs
                .iter()
                .filter(|l| l.serial_unit_id == Some(unit.id))
                .count(),
            trace_logs: trace_logs
                .iter()
                .filter(|l| l.serial_unit_id == Some(unit.id))
                .count(),
            inspection_logs: inspection_logs
                .iter()
                .filter(|l| l.serial_unit_id == Some(unit.id))
                .count(),
            defect_logs: defect_logs
                .iter()
                .filter(|l| l.serial_unit_id == Some(unit.id))
                .count(),
        })
        .collect())
}
