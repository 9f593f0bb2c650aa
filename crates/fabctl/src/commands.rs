use colored::Colorize;
use fabric_alloc::{Allocator, FileStore, TenantRecord};
use fabric_alloc_config::Settings;
use std::path::Path;

pub async fn reserve(allocator: &Allocator<FileStore>, name: &str, json: bool) -> anyhow::Result<()> {
    let record = allocator.reserve(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{} {}", "✓ Reserved tenant".green(), name.cyan());
        print_record(&record);
    }
    Ok(())
}

pub async fn free(allocator: &Allocator<FileStore>, name: &str, json: bool) -> anyhow::Result<()> {
    allocator.free(name).await?;

    if json {
        println!("{}", serde_json::json!({ "freed": name }));
    } else {
        println!("{} {}", "✓ Freed tenant".green(), name.cyan());
    }
    Ok(())
}

pub async fn get(allocator: &Allocator<FileStore>, name: &str, json: bool) -> anyhow::Result<()> {
    let record = allocator.get(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match record {
        Some(record) => {
            println!("{}", record.system_id.cyan().bold());
            print_record(&record);
        }
        None => println!("{}", format!("Tenant {} does not exist", name).dimmed()),
    }
    Ok(())
}

pub async fn list(allocator: &Allocator<FileStore>, json: bool) -> anyhow::Result<()> {
    let records = allocator.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No tenants".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<24} {:<11} {:<20} {:<34} {:<20}",
            "NAME", "VLANS", "SERVICE SUBNET", "MULTICAST RANGE", "POD SUBNET"
        )
        .bold()
    );
    println!("{}", "─".repeat(113).dimmed());

    for record in &records {
        println!(
            "{:<24} {:<11} {:<20} {:<34} {:<20}",
            record.system_id,
            format!("{}/{}", record.kubeapi_vlan, record.service_vlan),
            record.service_subnet.to_string(),
            format!("{}-{}", record.multicast_range_start, record.multicast_range_end),
            record.pod_subnet.to_string()
        );
    }

    println!();
    println!("{} tenant(s)", records.len());
    Ok(())
}

pub fn show_config(settings: &Settings, source: Option<&Path>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    match source {
        Some(path) => println!("# {}", path.display().to_string().cyan()),
        None => println!("# {}", "defaults (no settings file found)".dimmed()),
    }
    println!("# state dir: {}", settings.store.state_dir()?.display());
    print!("{}", serde_yaml::to_string(settings)?);
    Ok(())
}

fn print_record(record: &TenantRecord) {
    println!("  {:<18} {}", "kubeapi vlan", record.kubeapi_vlan);
    println!("  {:<18} {}", "service vlan", record.service_vlan);
    println!("  {:<18} {}", "service subnet", record.service_subnet);
    println!(
        "  {:<18} {} - {}",
        "multicast range", record.multicast_range_start, record.multicast_range_end
    );
    println!("  {:<18} {}", "pod subnet", record.pod_subnet);
}
