//! Database reports posted under `Wikipedia:Database reports/`

use super::constants::{categories, templates};
use super::context::{listify, sorted, Source, TaskContext};
use crate::models::ReportTask;
use crate::wiki::{Edit, Namespace};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Header of every report page
pub const UPDATED_AT: &str =
    "This report updated at <onlyinclude>~~~~~</onlyinclude> {{Bots|deny=luckyrename}}\n";

pub const UPDATING_REPORT: &str = "BOT: Updating report";

/// Root of all report pages
pub const DBR: &str = "Wikipedia:Database reports/";

/// Matches a `day month year` date, as found in dated deletion category names
pub const DMY_REGEX: &str = r"\d{1,2}? (January|February|March|April|May|June|July|August|September|October|November|December) \d{4}?";

pub struct Reports {
    ctx: TaskContext,
}

impl Reports {
    pub fn new(ctx: TaskContext) -> Self {
        Self {
            ctx: ctx.with_config_prefix(DBR),
        }
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub async fn run(&self, task: ReportTask) -> Result<()> {
        match task {
            ReportTask::ShadowsCommonsPage => self.shadows_commons_page().await,
            ReportTask::OrphanedFilesForDiscussion => self.orphaned_files_for_discussion().await,
            ReportTask::AllFreeLicenseTags => self.all_free_license_tags().await,
            ReportTask::OrphanedTimedText => self.orphaned_timed_text().await,
            ReportTask::MalformedSpiReports => self.malformed_spi_reports().await,
            ReportTask::OrphanedKeepLocal => self.orphaned_keep_local().await,
            ReportTask::OversizedFairUseFiles => self.oversized_fair_use_files().await,
            ReportTask::MissingFileCopyrightTags => self.missing_file_copyright_tags().await,
            ReportTask::DuplicateOnCommons => self.duplicate_on_commons().await,
            ReportTask::LowResolutionFreeFiles => self.low_resolution_free_files().await,
            ReportTask::PossiblyUnsourcedFiles => self.possibly_unsourced_files().await,
            ReportTask::ImpossibleDailyDeletion => self.impossible_daily_deletion().await,
            ReportTask::ShadowsCommonsNonFree => self.shadows_commons_non_free().await,
            ReportTask::NonFreePdfs => self.non_free_pdfs().await,
            ReportTask::OrphanedFileTalk => self.orphaned_file_talk().await,
            ReportTask::OrphanedPdfs => self.orphaned_pdfs().await,
            ReportTask::TranscludedNonExistentTemplates => {
                self.transcluded_non_existent_templates().await
            }
            ReportTask::FlickrFiles => self.flickr_files().await,
            ReportTask::LargeIpTalkPages => self.large_ip_talk_pages().await,
            ReportTask::LargeUserTalkPages => self.large_user_talk_pages().await,
            ReportTask::MultiExtFilenames => self.multi_ext_filenames().await,
            ReportTask::GettyFiles => self.getty_files().await,
            ReportTask::ApFiles => self.ap_files().await,
            ReportTask::UnfiledRfas => self.unfiled_rfas().await,
            ReportTask::FullyProtectedUserTalk => self.fully_protected_user_talk().await,
            ReportTask::OrphanedKeepLocalWithCommonsDuplicate => {
                self.orphaned_keep_local_with_commons_duplicate().await
            }
        }
    }

    // helpers

    /// Replace the text of a report page
    async fn post(&self, subpage: &str, text: String) -> Result<()> {
        tracing::info!(subpage = subpage, "Generating report");
        let title = format!("{}{}", DBR, subpage);
        self.ctx
            .wiki()
            .edit(&title, &Edit::replace(text, UPDATING_REPORT))
            .await
            .with_context(|| format!("Failed to update {}", title))
    }

    /// Post `titles` as a sorted bullet list under the standard header
    async fn simple_update<I>(&self, subpage: &str, titles: I, escape: bool) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.post(subpage, listify(&sorted(titles), escape, UPDATED_AT))
            .await
    }

    /// Post `titles`, each wrapped in `{{template_title|title}}`
    async fn dump_with_template<I>(&self, subpage: &str, template_title: &str, titles: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let lines: Vec<String> = sorted(titles)
            .iter()
            .map(|t| format!("* {{{{{}|{}}}}}", template_title, t))
            .collect();
        self.post(subpage, format!("{}{}", UPDATED_AT, lines.join("\n")))
            .await
    }

    async fn dump_no_redirect<I>(&self, subpage: &str, titles: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.dump_with_template(subpage, "No redirect", titles).await
    }

    /// Post a toolforge report of files as-is
    async fn dump_file_report(&self, subpage: &str, report: u32) -> Result<()> {
        let titles = self.ctx.fetch_report(report, Namespace::FILE).await?;
        self.simple_update(subpage, titles, true).await
    }

    /// Links on the ignore page of `subpage`
    async fn contents_of_ignore(&self, subpage: &str) -> Result<Vec<String>> {
        Ok(self
            .ctx
            .wiki()
            .links_on_page(&self.ctx.ignore_of(subpage), &[])
            .await?)
    }

    async fn file_transclusions(&self, template: &str) -> Result<HashSet<String>> {
        Ok(self
            .ctx
            .transclusions(template, &[Namespace::FILE])
            .await?
            .into_iter()
            .collect())
    }

    // reports

    /// Report 1
    pub async fn shadows_commons_page(&self) -> Result<()> {
        let subpage = "File description pages shadowing a Commons file or redirect";
        let titles = self
            .ctx
            .difference_of(&[
                Source::report(11),
                Source::page(self.ctx.ignore_of(subpage)),
            ])
            .await?;
        self.dump_no_redirect(subpage, titles).await
    }

    /// Report 2. Files transcluding `{{Ffd}}` without a link from a discussion.
    pub async fn orphaned_files_for_discussion(&self) -> Result<()> {
        let tagged = self.ctx.transclusions(templates::FFD, &[Namespace::FILE]).await?;
        let titles: Vec<String> = self
            .ctx
            .wiki()
            .what_links_here(&tagged)
            .await?
            .into_iter()
            .filter(|(_, links)| !links.iter().any(|l| l == "Wikipedia:Files for discussion"))
            .map(|(title, _)| title)
            .collect();
        self.simple_update("Files tagged for FfD missing an FfD nomination", titles, true)
            .await
    }

    /// Report 3. Free license tags, and the ones which do not exist on Commons.
    pub async fn all_free_license_tags(&self) -> Result<()> {
        let subpage = "All free license tags";
        let wiki = self.ctx.wiki();

        let mut tags = HashSet::new();
        for category in wiki
            .links_on_page(&self.ctx.config_of(subpage, "Sources"), &[])
            .await?
        {
            tags.extend(
                wiki.category_members(&category, &[Namespace::TEMPLATE])
                    .await?
                    .into_iter()
                    .filter(|t| !t.ends_with("/sandbox")),
            );
        }

        let ignored = self.contents_of_ignore(subpage).await?;
        let tags = sorted(
            self.ctx
                .difference_of(&[Source::Titles(tags), Source::from(ignored)])
                .await?,
        );
        self.simple_update(subpage, tags.clone(), false).await?;

        let missing = TaskContext::exists_filter(self.ctx.commons(), &tags, false).await?;
        self.simple_update("Free license tags which do not exist on Commons", missing, false)
            .await
    }

    /// Report 4
    pub async fn orphaned_timed_text(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(19, Namespace::TIMED_TEXT)
            .await?;
        self.dump_no_redirect("Timed Text without a corresponding File", titles)
            .await
    }

    /// Report 5. Cases are null edited first, since many are false positives fixed by a purge.
    pub async fn malformed_spi_reports(&self) -> Result<()> {
        let subpage = "Malformed SPI Cases";
        let ctx = &self.ctx;
        let wiki = ctx.wiki();

        let ignored = self.contents_of_ignore(subpage).await?;
        let candidates = ctx
            .difference_of(&[
                Source::report_in(17, Namespace::PROJECT),
                Source::page_in(templates::SPI_CASE_STATUS, Namespace::PROJECT),
                Source::page_in(templates::SPI_ARCHIVE_NOTICE, Namespace::PROJECT),
                Source::from(ignored),
            ])
            .await?;
        let cases = sorted(TaskContext::exists_filter(wiki, &sorted(candidates), true).await?);

        for (title, text) in wiki.page_texts(&cases).await? {
            if let Err(e) = wiki.edit(&title, &Edit::replace(text, "null edit")).await {
                tracing::warn!(title = %title, error = %e, "Null edit failed");
            }
        }

        self.post(
            subpage,
            listify(&cases, false, &format!("{{{{/Header}}}}\n{}", UPDATED_AT)),
        )
        .await
    }

    /// Report 6
    pub async fn orphaned_keep_local(&self) -> Result<()> {
        let keep_local = self.file_transclusions(templates::KEEP_LOCAL).await?;
        let mut titles = self.ctx.fetch_report(9, Namespace::FILE).await?;
        titles.retain(|t| keep_local.contains(t));
        self.simple_update("Orphaned free files tagged keep local", titles, true)
            .await
    }

    /// Report 8
    pub async fn oversized_fair_use_files(&self) -> Result<()> {
        let subpage = "Large fair-use images";
        let titles = self
            .ctx
            .difference_of(&[
                Source::report(7),
                Source::page(templates::DELETABLE_FILE),
                Source::page(self.ctx.ignore_of(subpage)),
            ])
            .await?;
        self.simple_update(subpage, titles, true).await
    }

    /// Report 9. Files in no category other than the allowed ones.
    pub async fn missing_file_copyright_tags(&self) -> Result<()> {
        let subpage = "Files without a license tag";
        let ctx = &self.ctx;

        let allowed: HashSet<String> = ctx
            .wiki()
            .links_on_page(&ctx.config_of(subpage, "Allow"), &[])
            .await?
            .into_iter()
            .collect();
        let candidates = ctx
            .difference_of(&[
                Source::report(8),
                Source::report(5),
                Source::report(6),
                Source::page(templates::DELETABLE_FILE),
                Source::page(ctx.ignore_of(subpage)),
            ])
            .await?;

        let titles: Vec<String> = ctx
            .wiki()
            .categories_on_page(&sorted(candidates))
            .await?
            .into_iter()
            .filter(|(_, cats)| !cats.is_empty() && cats.iter().all(|c| !allowed.contains(c)))
            .map(|(title, _)| title)
            .collect();
        self.simple_update(subpage, titles, true).await
    }

    /// Report 10
    pub async fn duplicate_on_commons(&self) -> Result<()> {
        let subpage = "Local files with a duplicate on Commons";
        let nominated = self
            .ctx
            .commons_transclusions(templates::DELETION_TEMPLATE_TAG, &[Namespace::FILE])
            .await?;
        let titles = self
            .ctx
            .difference_of(&[
                Source::report(1),
                Source::page(templates::DELETABLE_FILE),
                Source::from(nominated),
                Source::page(self.ctx.ignore_of(subpage)),
            ])
            .await?;
        self.simple_update(subpage, titles, true).await
    }

    /// Report 11
    pub async fn low_resolution_free_files(&self) -> Result<()> {
        let titles = self
            .ctx
            .difference_of(&[
                Source::report(10),
                Source::page(categories::IMAGES_AVAILABLE_AS_SVG),
                Source::page(categories::PROPOSED_FOR_DELETION),
            ])
            .await?;
        self.simple_update("Orphaned low-resolution free files", titles, true)
            .await
    }

    /// Report 12
    pub async fn possibly_unsourced_files(&self) -> Result<()> {
        self.dump_file_report("Free files without a machine-readable source", 12)
            .await
    }

    /// Report 13. Files in a dated deletion category whose date can never come up.
    ///
    /// The sources page is a JSON object mapping a parent of dated categories to the category
    /// holding every file of that deletion type.
    pub async fn impossible_daily_deletion(&self) -> Result<()> {
        let subpage = "Files for daily deletion with an impossible date";
        let ctx = &self.ctx;
        let wiki = ctx.wiki();
        let dated = Regex::new(&format!(r"^.+?{}", DMY_REGEX))?;

        let sources_page = ctx.config_of(subpage, "Sources");
        let sources: BTreeMap<String, String> =
            serde_json::from_str(&wiki.page_text(&sources_page).await?)
                .with_context(|| format!("Failed to parse sources on {}", sources_page))?;

        let mut titles = HashSet::new();
        for (parent, all_category) in &sources {
            let mut terms = vec![Source::page(all_category.clone())];
            terms.extend(
                wiki.category_members(parent, &[Namespace::CATEGORY])
                    .await?
                    .into_iter()
                    .filter(|c| dated.is_match(c))
                    .map(Source::page),
            );
            titles.extend(ctx.difference_of(&terms).await?);
        }

        self.simple_update(subpage, titles, true).await
    }

    /// Report 14
    pub async fn shadows_commons_non_free(&self) -> Result<()> {
        let non_free = self.ctx.fetch_report(5, Namespace::FILE).await?;
        let mut titles = self.ctx.fetch_report(13, Namespace::FILE).await?;
        titles.retain(|t| non_free.contains(t));
        self.dump_with_template("Non-free files shadowing a Commons file", "/Template", titles)
            .await
    }

    /// Report 15
    pub async fn non_free_pdfs(&self) -> Result<()> {
        self.dump_file_report("Non-free PDFs", 15).await
    }

    /// Report 16
    pub async fn orphaned_file_talk(&self) -> Result<()> {
        let titles = self
            .ctx
            .difference_of(&[
                Source::report_in(16, Namespace::FILE_TALK),
                Source::page_in(categories::ORPHANED_TALK_NOT_SPEEDY, Namespace::FILE_TALK),
            ])
            .await?;
        self.simple_update("Orphaned file talk pages", titles, false)
            .await
    }

    /// Report 17
    pub async fn orphaned_pdfs(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(9, Namespace::FILE)
            .await?
            .into_iter()
            .filter(|t| t.to_lowercase().ends_with(".pdf"));
        self.simple_update("Orphaned PDFs", titles, true).await
    }

    /// Report 18
    pub async fn transcluded_non_existent_templates(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(14, Namespace::TEMPLATE)
            .await?
            .into_iter()
            .map(|t| format!("Special:WhatLinksHere/{}", t));
        self.simple_update("Transclusions of non-existent templates", titles, false)
            .await
    }

    /// Report 19
    pub async fn flickr_files(&self) -> Result<()> {
        let titles = self
            .ctx
            .difference_of(&[Source::report(18), Source::page(templates::KEEP_LOCAL)])
            .await?;
        self.simple_update("Free files which link to Flickr", titles, true)
            .await
    }

    /// Report 20
    pub async fn large_ip_talk_pages(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(20, Namespace::USER_TALK)
            .await?;
        self.simple_update("Unusually large IP talk pages", titles, false)
            .await
    }

    /// Report 21
    pub async fn large_user_talk_pages(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(21, Namespace::USER_TALK)
            .await?;
        self.simple_update("Unusually large user talk pages", titles, false)
            .await
    }

    /// Report 22
    pub async fn multi_ext_filenames(&self) -> Result<()> {
        self.dump_file_report("Filenames with multiple extensions", 22)
            .await
    }

    /// Report 23. Files which transclude none of the templates on the ignore page.
    pub async fn getty_files(&self) -> Result<()> {
        let subpage = "Files credited to Getty Images";
        let ignored: HashSet<String> = self
            .contents_of_ignore(subpage)
            .await?
            .into_iter()
            .collect();
        let credited = self.ctx.fetch_report(23, Namespace::FILE).await?;

        let titles: Vec<String> = self
            .ctx
            .wiki()
            .templates_on_page(&sorted(credited))
            .await?
            .into_iter()
            .filter(|(_, used)| used.iter().all(|t| !ignored.contains(t)))
            .map(|(title, _)| title)
            .collect();
        self.simple_update(subpage, titles, true).await
    }

    /// Report 24
    pub async fn ap_files(&self) -> Result<()> {
        self.dump_file_report("Files credited to The Associated Press", 24)
            .await
    }

    /// Report 25
    pub async fn unfiled_rfas(&self) -> Result<()> {
        let subpage = "Unfiled RfAs";
        let mut sources = vec![Source::report_in(25, Namespace::PROJECT)];
        sources.extend(
            self.contents_of_ignore(subpage)
                .await?
                .into_iter()
                .map(|page| Source::page_in(page, Namespace::PROJECT)),
        );
        let titles = self.ctx.difference_of(&sources).await?;
        self.simple_update(subpage, titles, true).await
    }

    /// Report 26
    pub async fn fully_protected_user_talk(&self) -> Result<()> {
        let titles = self
            .ctx
            .fetch_report(26, Namespace::USER_TALK)
            .await?;
        self.simple_update("Fully protected user talk pages", titles, false)
            .await
    }

    /// Report 27
    pub async fn orphaned_keep_local_with_commons_duplicate(&self) -> Result<()> {
        let keep_local = self.file_transclusions(templates::KEEP_LOCAL).await?;
        let orphaned = self.ctx.fetch_report(9, Namespace::FILE).await?;
        let mut titles = self.ctx.fetch_report(1, Namespace::FILE).await?;
        titles.retain(|t| orphaned.contains(t) && keep_local.contains(t));
        self.simple_update("Orphaned files copied to Commons tagged keep local", titles, true)
            .await
    }
}
