use crate::infra::{parse_organization, InMemoryPackageRepository, InMemoryReportRepository};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tax_reports::config::AppConfig;
use tax_reports::error::AppError;
use tax_reports::workflows::reports::{
    AssignParams, CompletenessCheck, OfficeId, OrganizationType, Report, ReportCsvImporter,
    ReportDecorator, ReportId, ReportRepository, ReportStateService, ReviewParams, SearchService,
    TransmissibilityCheck, TransmissionService,
};

const SAMPLE_EXPORT: &str = "\
id,collectivity_id,form_type,anomalies,priority,code_insee,date_constat,observations,situation_annee_majic,situation_invariant,situation_parcelle,situation_proprietaire,situation_numero_ordre_proprietaire,situation_numero_voie,situation_indice_repetition,situation_libelle_voie,situation_code_rivoli,situation_numero_batiment,situation_numero_escalier,situation_numero_niveau,situation_numero_porte,situation_affectation,situation_nature,situation_categorie,situation_surface_reelle,situation_coefficient_entretien,situation_coefficient_situation_generale,situation_coefficient_situation_particuliere,proposition_affectation,proposition_nature,proposition_categorie,proposition_surface_reelle,proposition_numero_voie,proposition_libelle_voie,proposition_code_rivoli,proposition_date_achevement
demo-1,64102,evaluation_local_habitation,consistance,high,64102,12/03/2024,Véranda non déclarée,2023,0123456789,AB 0123,Dupont Marie,+01234,12,,rue des Lilas,0120,A,01,02,01005,H,AP,5,\"85,5\",1,0,\"0,05\",,AP,4,104,,,,
demo-2,64102,creation_local_habitation,construction_neuve,,64102,2024-02-01,,,,,,,,,,,,,,,,,,,,,,,MA,,,8,chemin des Crêtes,B063,2023-11-30
";

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// CSV export of reports to check
    pub(crate) csv: PathBuf,
    /// Organization whose vocabulary is used for states
    #[arg(long, default_value = "collectivity", value_parser = parse_organization)]
    pub(crate) organization: OrganizationType,
    /// Optional search query run over the imported reports
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Office the demo report is assigned to
    #[arg(long, default_value = "sip-bayonne")]
    pub(crate) office: String,
    /// Transmit packages in sandbox mode regardless of configuration
    #[arg(long)]
    pub(crate) sandbox: bool,
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let reports = ReportCsvImporter::from_path(&args.csv)?;
    println!(
        "{} report(s) read from {}",
        reports.len(),
        args.csv.display()
    );

    for report in &reports {
        print_completeness(report, args.organization);
    }

    let summary = TransmissibilityCheck::new(&reports, std::iter::empty()).summary();
    println!("\nTransmissible: {}", summary.transmissible.len());
    for (reason, ids) in &summary.intransmissible {
        let ids: Vec<&str> = ids.iter().map(|id| id.0.as_str()).collect();
        println!("  {} : {}", reason.label(), ids.join(", "));
    }

    if let Some(query) = args.search.as_deref() {
        let limit = AppConfig::load()?.reports.search_limit;
        let search = SearchService::new(args.organization, limit);
        let found = search.search(&reports, query);
        println!("\nSearch \"{}\": {} result(s)", query, found.len());
        for report in found {
            let decorator = ReportDecorator::new(report, args.organization);
            println!("  {} [{}]", report.id, decorator.state_label());
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let sandbox = args.sandbox || config.reports.sandbox;

    let repository = Arc::new(InMemoryReportRepository::default());
    let packages = Arc::new(InMemoryPackageRepository::default());
    for report in ReportCsvImporter::from_reader(SAMPLE_EXPORT.as_bytes())? {
        repository.insert(report)?;
    }

    let states = ReportStateService::new(repository.clone());
    let transmissions = TransmissionService::new(repository.clone(), packages, sandbox);

    println!("Tax report workflow demo");
    let mut drafts = repository.all()?;
    for report in &mut drafts {
        states.complete(report)?;
        print_step("complete", report);
    }

    let Some(first) = drafts.first() else {
        println!("  No sample report to transmit");
        return Ok(());
    };
    let mut transmission = transmissions.start(first.collectivity_id.clone());
    let addition = transmissions.add(&mut transmission, &drafts);
    println!(
        "\nTransmission: {} report(s) added, sandbox = {}",
        addition.added.len(),
        transmission.sandbox
    );
    for package in transmissions.complete(&mut transmission)? {
        println!(
            "  Package {} ({}) with {} report(s)",
            package.reference,
            package.form_type.label(),
            package.report_ids.len()
        );
    }

    println!("\nOffice review");
    let mut report = states.fetch(&ReportId("demo-1".to_string()))?;
    print_step("transmit", &report);
    states.acknowledge(&mut report)?;
    print_step("acknowledge", &report);
    states.accept(&mut report)?;
    print_step("accept", &report);
    states.assign(
        &mut report,
        AssignParams {
            office_id: Some(OfficeId(args.office)),
        },
    )?;
    print_step("assign", &report);
    states.process(&mut report)?;
    print_step("process", &report);
    states.approve(
        &mut report,
        ReviewParams {
            reponse: Some("Local réévalué".to_string()),
        },
    )?;
    print_step("approve", &report);
    states.confirm(&mut report)?;
    print_step("confirm", &report);

    let view = ReportDecorator::new(&report, OrganizationType::Collectivity).view();
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("\nCollectivity view:\n{}", json),
        Err(err) => println!("\nCollectivity view unavailable: {}", err),
    }

    Ok(())
}

fn print_completeness(report: &Report, organization_type: OrganizationType) {
    let decorator = ReportDecorator::new(report, organization_type);
    let errors = CompletenessCheck::new(report).errors();
    if errors.is_empty() {
        println!(
            "  {} [{}] {} : complet",
            report.id,
            decorator.state_label(),
            decorator.form_type_label()
        );
        return;
    }

    println!(
        "  {} [{}] {} : {} erreur(s)",
        report.id,
        decorator.state_label(),
        decorator.form_type_label(),
        errors.len()
    );
    for message in errors.full_messages() {
        println!("    - {}", message);
    }
}

fn print_step(step: &str, report: &Report) {
    let collectivity = ReportDecorator::new(report, OrganizationType::Collectivity);
    let office = ReportDecorator::new(report, OrganizationType::Ddfip);
    println!(
        "  {:<12} {:<8} collectivité: {:<22} DDFIP: {}",
        step,
        report.id,
        collectivity.state_label(),
        office.state_label()
    );
}
