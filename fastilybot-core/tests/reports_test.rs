//! Database reports against an in-memory wiki

mod support;

use fastilybot_core::models::ReportTask;
use fastilybot_core::tasks::reports::{UPDATED_AT, UPDATING_REPORT};
use fastilybot_core::tasks::Reports;
use fastilybot_core::wiki::{Edit, EditContent};
use support::{commons, context, enwiki, seed_report};
use tempfile::tempdir;

const DBR: &str = "Wikipedia:Database reports/";

fn report(body: &str) -> String {
    format!("{}{}", UPDATED_AT, body)
}

#[tokio::test]
async fn test_file_report_is_dumped_sorted_and_escaped() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 24, &["B_file.jpg", "A.jpg"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).run(ReportTask::ApFiles).await.unwrap();

    let edits = wiki.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(
        edits[0].0,
        format!("{}Files credited to The Associated Press", DBR)
    );
    assert_eq!(
        edits[0].1,
        Edit::replace(
            report("*[[:File:A.jpg]]\n*[[:File:B file.jpg]]"),
            UPDATING_REPORT
        )
    );
}

#[tokio::test]
async fn test_talk_page_report_is_not_escaped() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 20, &["127.0.0.1"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).large_ip_talk_pages().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Unusually large IP talk pages", DBR))
            .unwrap(),
        report("*[[User talk:127.0.0.1]]")
    );
}

#[tokio::test]
async fn test_orphaned_timed_text_uses_no_redirect() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 19, &["Foo.webm.en.srt"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).orphaned_timed_text().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Timed Text without a corresponding File", DBR))
            .unwrap(),
        report("* {{No redirect|TimedText:Foo.webm.en.srt}}")
    );
}

#[tokio::test]
async fn test_transcluded_non_existent_templates() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 14, &["Missing_one"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx)
        .transcluded_non_existent_templates()
        .await
        .unwrap();

    assert_eq!(
        wiki.text(&format!("{}Transclusions of non-existent templates", DBR))
            .unwrap(),
        report("*[[Special:WhatLinksHere/Template:Missing one]]")
    );
}

#[tokio::test]
async fn test_all_free_license_tags() {
    let dir = tempdir().unwrap();
    let subpage = format!("{}All free license tags", DBR);
    let wiki = enwiki()
        .with_links(&format!("{}/Sources", subpage), &["Category:Free licenses"])
        .with_links(&format!("{}/Ignore", subpage), &["Template:Local only"])
        .with_category(
            "Category:Free licenses",
            &[
                "Template:Cc-by-4.0",
                "Template:Cc-by-4.0/sandbox",
                "Template:GFDL",
                "Template:Local only",
                "File:Not a template.png",
            ],
        );
    let commons = commons().with_page("Template:Cc-by-4.0", "license");
    let (ctx, wiki, _) = context(wiki, commons, dir.path());

    Reports::new(ctx).run(ReportTask::AllFreeLicenseTags).await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("*[[Template:Cc-by-4.0]]\n*[[Template:GFDL]]")
    );
    assert_eq!(
        wiki.text(&format!("{}Free license tags which do not exist on Commons", DBR))
            .unwrap(),
        report("*[[Template:GFDL]]")
    );
}

#[tokio::test]
async fn test_malformed_spi_reports_null_edits_cases_first() {
    let dir = tempdir().unwrap();
    seed_report(
        dir.path(),
        17,
        &[
            "Sockpuppet_investigations/Bad",
            "Sockpuppet investigations/Good",
            "Sockpuppet investigations/Gone",
        ],
    );
    let wiki = enwiki()
        .with_transclusions(
            "Template:SPI case status",
            &["Wikipedia:Sockpuppet investigations/Good"],
        )
        .with_page("Wikipedia:Sockpuppet investigations/Bad", "case")
        .with_page("Wikipedia:Sockpuppet investigations/Good", "{{SPI case status}}");
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).malformed_spi_reports().await.unwrap();

    let edits = wiki.edits();
    assert_eq!(edits.len(), 2);
    assert_eq!(
        edits[0],
        (
            "Wikipedia:Sockpuppet investigations/Bad".to_string(),
            Edit::replace("case", "null edit")
        )
    );
    assert_eq!(edits[1].0, format!("{}Malformed SPI Cases", DBR));
    assert_eq!(
        edits[1].1.content,
        EditContent::Replace(format!(
            "{{{{/Header}}}}\n{}*[[Wikipedia:Sockpuppet investigations/Bad]]",
            UPDATED_AT
        ))
    );
}

#[tokio::test]
async fn test_impossible_daily_deletion() {
    let dir = tempdir().unwrap();
    let subpage = format!("{}Files for daily deletion with an impossible date", DBR);
    let wiki = enwiki()
        .with_page(
            &format!("{}/Sources", subpage),
            r#"{"Category:Wikipedia files with unknown source": "Category:All Wikipedia files with unknown source"}"#,
        )
        .with_category(
            "Category:Wikipedia files with unknown source",
            &[
                "Category:Wikipedia files with unknown source as of 5 January 2024",
                "Category:Wikipedia files with unknown source for review",
            ],
        )
        .with_category(
            "Category:Wikipedia files with unknown source as of 5 January 2024",
            &["File:Dated.png"],
        )
        .with_category(
            "Category:Wikipedia files with unknown source for review",
            &["File:Impossible.png"],
        )
        .with_category(
            "Category:All Wikipedia files with unknown source",
            &["File:Dated.png", "File:Impossible.png"],
        );
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).impossible_daily_deletion().await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("*[[:File:Impossible.png]]")
    );
}

#[tokio::test]
async fn test_impossible_daily_deletion_rejects_bad_sources() {
    let dir = tempdir().unwrap();
    let wiki = enwiki().with_page(
        &format!("{}Files for daily deletion with an impossible date/Sources", DBR),
        "not json",
    );
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    let err = Reports::new(ctx)
        .impossible_daily_deletion()
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse sources"));
    assert!(wiki.edits().is_empty());
}

#[tokio::test]
async fn test_orphaned_files_for_discussion() {
    let dir = tempdir().unwrap();
    let wiki = enwiki()
        .with_transclusions("Template:Ffd", &["File:Orphan.png", "File:Listed.png"])
        .with_backlinks("File:Listed.png", &["Wikipedia:Files for discussion"])
        .with_backlinks("File:Orphan.png", &["User talk:Uploader"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx)
        .run(ReportTask::OrphanedFilesForDiscussion)
        .await
        .unwrap();

    assert_eq!(
        wiki.text(&format!("{}Files tagged for FfD missing an FfD nomination", DBR))
            .unwrap(),
        report("*[[:File:Orphan.png]]")
    );
}

#[tokio::test]
async fn test_missing_file_copyright_tags() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 8, &["Allowed.png", "Untagged.png", "Uncategorized.png", "Nonfree.png"]);
    seed_report(dir.path(), 5, &["Nonfree.png"]);
    seed_report(dir.path(), 6, &[]);

    let subpage = format!("{}Files without a license tag", DBR);
    let wiki = enwiki()
        .with_links(&format!("{}/Allow", subpage), &["Category:Files with OTRS permission"])
        .with_categories("File:Allowed.png", &["Category:Files with OTRS permission"])
        .with_categories("File:Untagged.png", &["Category:Maps"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).missing_file_copyright_tags().await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("*[[:File:Untagged.png]]")
    );
}

#[tokio::test]
async fn test_orphaned_keep_local_with_commons_duplicate() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 1, &["Both.png", "Used.png"]);
    seed_report(dir.path(), 9, &["Both.png", "Unkept.png", "Used.png"]);
    let wiki = enwiki().with_transclusions("Template:Keep local", &["File:Both.png", "File:Kept.png"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx)
        .orphaned_keep_local_with_commons_duplicate()
        .await
        .unwrap();

    assert_eq!(
        wiki.text(&format!("{}Orphaned files copied to Commons tagged keep local", DBR))
            .unwrap(),
        report("*[[:File:Both.png]]")
    );
}

#[tokio::test]
async fn test_missing_report_fails_without_posting() {
    let dir = tempdir().unwrap();
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    let err = Reports::new(ctx).non_free_pdfs().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to fetch report 15"));
    assert!(wiki.edits().is_empty());
}

#[tokio::test]
async fn test_shadows_commons_page_skips_ignored() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 11, &["Shadow.jpg", "Ignored.jpg"]);
    let subpage = format!("{}File description pages shadowing a Commons file or redirect", DBR);
    let wiki = enwiki()
        .with_links(&format!("{}/Ignore", subpage), &["Template:Shadows Commons ok"])
        .with_transclusions("Template:Shadows Commons ok", &["File:Ignored.jpg"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).run(ReportTask::ShadowsCommonsPage).await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("* {{No redirect|File:Shadow.jpg}}")
    );
}

#[tokio::test]
async fn test_orphaned_keep_local() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 9, &["Kept.png", "Plain.png"]);
    let wiki = enwiki().with_transclusions("Template:Keep local", &["File:Kept.png", "File:Used.png"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).orphaned_keep_local().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Orphaned free files tagged keep local", DBR))
            .unwrap(),
        report("*[[:File:Kept.png]]")
    );
}

#[tokio::test]
async fn test_oversized_fair_use_files_skip_deletable() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 7, &["Big.jpg", "Doomed.jpg"]);
    let wiki = enwiki().with_transclusions("Template:Deletable file", &["File:Doomed.jpg"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).oversized_fair_use_files().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Large fair-use images", DBR)).unwrap(),
        report("*[[:File:Big.jpg]]")
    );
}

#[tokio::test]
async fn test_duplicate_on_commons_skips_files_nominated_on_commons() {
    let dir = tempdir().unwrap();
    seed_report(
        dir.path(),
        1,
        &["Dupe.jpg", "Nominated.jpg", "Deletable.jpg", "Ignored.jpg"],
    );
    let subpage = format!("{}Local files with a duplicate on Commons", DBR);
    let wiki = enwiki()
        .with_transclusions("Template:Deletable file", &["File:Deletable.jpg"])
        .with_links(&format!("{}/Ignore", subpage), &["Category:Kept duplicates"])
        .with_category("Category:Kept duplicates", &["File:Ignored.jpg"]);
    let commons = commons().with_transclusions(
        "Template:Deletion template tag",
        &["File:Nominated.jpg", "Commons:Deletion requests/File:Nominated.jpg"],
    );
    let (ctx, wiki, _) = context(wiki, commons, dir.path());

    Reports::new(ctx).duplicate_on_commons().await.unwrap();

    assert_eq!(wiki.text(&subpage).unwrap(), report("*[[:File:Dupe.jpg]]"));
}

#[tokio::test]
async fn test_low_resolution_free_files() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 10, &["Low.png", "Svg.png", "Prod.png"]);
    let wiki = enwiki()
        .with_category("Category:Wikipedia images available as SVG", &["File:Svg.png"])
        .with_category("Category:All files proposed for deletion", &["File:Prod.png"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).low_resolution_free_files().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Orphaned low-resolution free files", DBR))
            .unwrap(),
        report("*[[:File:Low.png]]")
    );
}

#[tokio::test]
async fn test_shadows_commons_non_free_intersects_reports() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 5, &["A.png", "B_b.png"]);
    seed_report(dir.path(), 13, &["B_b.png", "C.png"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).shadows_commons_non_free().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Non-free files shadowing a Commons file", DBR))
            .unwrap(),
        report("* {{/Template|File:B b.png}}")
    );
}

#[tokio::test]
async fn test_orphaned_file_talk_filters_namespace() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 16, &["Orphan.jpg", "Kept.jpg"]);
    let wiki = enwiki().with_category(
        "Category:Wikipedia orphaned talk pages that should not be speedily deleted",
        &["File talk:Kept.jpg", "Talk:Orphan.jpg"],
    );
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).orphaned_file_talk().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Orphaned file talk pages", DBR)).unwrap(),
        report("*[[File talk:Orphan.jpg]]")
    );
}

#[tokio::test]
async fn test_orphaned_pdfs_match_any_case() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 9, &["Doc.PDF", "Scan.pdf", "Photo.jpg", "pdf.png"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).orphaned_pdfs().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Orphaned PDFs", DBR)).unwrap(),
        report("*[[:File:Doc.PDF]]\n*[[:File:Scan.pdf]]")
    );
}

#[tokio::test]
async fn test_flickr_files_skip_keep_local() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 18, &["Flickr.jpg", "Local.jpg"]);
    let wiki = enwiki().with_transclusions("Template:Keep local", &["File:Local.jpg"]);
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).flickr_files().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Free files which link to Flickr", DBR))
            .unwrap(),
        report("*[[:File:Flickr.jpg]]")
    );
}

#[tokio::test]
async fn test_getty_files_skip_ignored_templates() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 23, &["Getty.jpg", "Licensed.jpg", "Bare.jpg"]);
    let subpage = format!("{}Files credited to Getty Images", DBR);
    let wiki = enwiki()
        .with_links(&format!("{}/Ignore", subpage), &["Template:Non-free with permission"])
        .with_templates("File:Getty.jpg", &["Template:Information"])
        .with_templates(
            "File:Licensed.jpg",
            &["Template:Information", "Template:Non-free with permission"],
        );
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).getty_files().await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("*[[:File:Bare.jpg]]\n*[[:File:Getty.jpg]]")
    );
}

#[tokio::test]
async fn test_unfiled_rfas_resolve_ignore_pages_recursively() {
    let dir = tempdir().unwrap();
    seed_report(
        dir.path(),
        25,
        &[
            "Requests_for_adminship/Alice",
            "Requests for adminship/Bob",
            "Requests for adminship/Carol",
            "Requests for adminship/Dave",
        ],
    );
    let subpage = format!("{}Unfiled RfAs", DBR);
    let wiki = enwiki()
        .with_links(
            &format!("{}/Ignore", subpage),
            &[
                "Category:Successful requests for adminship",
                "Wikipedia:Requests for adminship/Archives",
            ],
        )
        .with_category(
            "Category:Successful requests for adminship",
            &["Wikipedia:Requests for adminship/Alice", "User:Dave"],
        )
        .with_links(
            "Wikipedia:Requests for adminship/Archives",
            &[
                "Wikipedia:Requests for adminship/Archives",
                "Category:Unsuccessful requests for adminship",
                "Template:Rfa withdrawn",
            ],
        )
        .with_category(
            "Category:Unsuccessful requests for adminship",
            &["Wikipedia:Requests for adminship/Bob"],
        )
        .with_transclusions(
            "Template:Rfa withdrawn",
            &["Wikipedia:Requests for adminship/Carol", "User talk:Dave"],
        );
    let (ctx, wiki, _) = context(wiki, commons(), dir.path());

    Reports::new(ctx).run(ReportTask::UnfiledRfas).await.unwrap();

    assert_eq!(
        wiki.text(&subpage).unwrap(),
        report("*[[:Wikipedia:Requests for adminship/Dave]]")
    );
}

#[tokio::test]
async fn test_fully_protected_user_talk() {
    let dir = tempdir().unwrap();
    seed_report(dir.path(), 26, &["Example", "Other_user"]);
    let (ctx, wiki, _) = context(enwiki(), commons(), dir.path());

    Reports::new(ctx).fully_protected_user_talk().await.unwrap();

    assert_eq!(
        wiki.text(&format!("{}Fully protected user talk pages", DBR))
            .unwrap(),
        report("*[[User talk:Example]]\n*[[User talk:Other user]]")
    );
}
