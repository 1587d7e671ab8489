mod common;

use rayon::prelude::*;

use capdoc_pdf::settings::{Classification, PageNumberFormat, Position, WatermarkKind};

/// Generations share nothing, so they can run side by side and still match
/// a sequential run page for page.
#[test]
fn independent_generations_in_parallel() {
    let _ = env_logger::try_init();
    let content = common::sample_content();
    let variants: Vec<_> = [
        Classification::Public,
        Classification::Internal,
        Classification::Confidential,
        Classification::Restricted,
    ]
    .into_iter()
    .flat_map(|c| {
        [Position::Left, Position::Center, Position::Right]
            .into_iter()
            .map(move |p| (c, p))
    })
    .collect();

    let settings_for = |(classification, position): (Classification, Position)| {
        let mut settings = common::sample_settings();
        settings.metadata.classification = classification;
        settings.header_footer.page_number_position = position;
        settings.header_footer.page_number_format = PageNumberFormat::PageOf;
        settings.branding.watermark = WatermarkKind::Classification;
        settings
    };

    let parallel: Vec<(usize, usize)> = variants
        .par_iter()
        .map(|&variant| {
            let settings = settings_for(variant);
            let (_, report) = common::assemble(&settings, &content);
            let pdf = capdoc_pdf::generate(&settings, &content).expect("pdf generation");
            assert!(pdf.starts_with(b"%PDF-"));
            (report.page_count, report.toc_entries.len())
        })
        .collect();

    let sequential: Vec<(usize, usize)> = variants
        .iter()
        .map(|&variant| {
            let (_, report) = common::assemble(&settings_for(variant), &content);
            (report.page_count, report.toc_entries.len())
        })
        .collect();

    assert_eq!(parallel, sequential);
    assert!(parallel.windows(2).all(|w| w[0] == w[1]), "{parallel:?}");
}
