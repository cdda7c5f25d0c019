use crate::commands::{block_on, load_config, CommandResult, StepFailure};
use bespoke_db::{connect_with_settings, migrations, CatalogSeed, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let result = block_on("seed", async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed = CatalogSeed::demo();
        let loaded = seed
            .load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = seed
            .verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;
        if verification.all_present {
            Ok::<SeedResult, StepFailure>(loaded)
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        }
    });

    match result {
        Ok(loaded) => CommandResult::success("seed", summary(&loaded)),
        Err(failure) => failure,
    }
}

fn summary(loaded: &SeedResult) -> String {
    format!(
        "demo catalog loaded: {} product families, {} product types, {} parameters, \
         {} options, {} specs, {} reference rows, {} parts, {} sku mappings",
        loaded.families,
        loaded.product_types,
        loaded.parameters,
        loaded.options,
        loaded.specs,
        loaded.reference_rows,
        loaded.parts,
        loaded.sku_mappings,
    )
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some catalog data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_failure_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("product_types", true), ("parts", false), ("sku_mappings", false)];

        assert_eq!(
            verification_failure_message(&checks),
            "Seed verification failed for checks: parts, sku_mappings"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("product_types", true), ("parts", true)];

        assert_eq!(verification_failure_message(&checks), "Some catalog data failed to load");
    }
}
