//! Article grid rendering.
//!
//! Cards are emitted with `data-src`/`data-type` attributes and without a
//! `src`, then the image loader is asked to observe the page again. Cards
//! are laid out on a fixed column grid so the viewport session has real
//! geometry to test against.

use std::sync::Arc;

use inkwell_model::{
    Article, ContentType, DEFAULT_PORTRAIT_URL, ElementId, FallbackCatalog,
    Rect,
};

use crate::controller::{ImageLoadController, SOURCE_ATTRIBUTE, TYPE_ATTRIBUTE};
use crate::dom::{DomError, ElementSpec, Page, SelectorList, SharedPage};
use crate::error::Result;
use crate::filter::{CategoryFilter, FilterSummary, SortOrder};
use crate::slot::LoaderSlot;

/// Fixed column grid used to place cards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub origin_x: f32,
    pub origin_y: f32,
    pub columns: usize,
    pub card_width: f32,
    pub card_height: f32,
    pub image_height: f32,
    pub avatar_size: f32,
    pub gap: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            origin_x: 40.0,
            // Below the hero section.
            origin_y: 640.0,
            columns: 3,
            card_width: 380.0,
            card_height: 520.0,
            image_height: 240.0,
            avatar_size: 40.0,
            gap: 32.0,
        }
    }
}

impl GridLayout {
    pub fn card_rect(&self, slot: usize) -> Rect {
        let columns = self.columns.max(1);
        let column = (slot % columns) as f32;
        let row = (slot / columns) as f32;
        Rect::new(
            self.origin_x + column * (self.card_width + self.gap),
            self.origin_y + row * (self.card_height + self.gap),
            self.card_width,
            self.card_height,
        )
    }

    pub fn image_rect(&self, card: &Rect) -> Rect {
        Rect::new(card.x, card.y, card.width, self.image_height)
    }

    pub fn avatar_rect(&self, card: &Rect) -> Rect {
        Rect::new(
            card.x + 24.0,
            card.bottom() - self.avatar_size - 24.0,
            self.avatar_size,
            self.avatar_size,
        )
    }

    /// Bottom edge of the grid holding `cards` visible cards.
    pub fn content_height(&self, cards: usize) -> f32 {
        let rows = cards.div_ceil(self.columns.max(1));
        self.origin_y + rows as f32 * (self.card_height + self.gap)
    }
}

/// The `.blog-grid` container and how to fill it.
#[derive(Debug, Clone)]
pub struct ArticleGrid {
    grid: ElementId,
    layout: GridLayout,
    catalog: FallbackCatalog,
    cards: SelectorList,
    image_slots: SelectorList,
    avatars: SelectorList,
}

impl ArticleGrid {
    /// Use the page's `.blog-grid`, creating one under the root if absent.
    pub fn mount(
        page: &mut Page,
        layout: GridLayout,
        catalog: FallbackCatalog,
    ) -> Result<Self> {
        let existing = page.query_selector(&SelectorList::parse(".blog-grid")?);
        let grid = match existing {
            Some(grid) => grid,
            None => page.append(
                page.root(),
                ElementSpec::new("section").class("blog-grid grid-view"),
            )?,
        };

        Ok(Self {
            grid,
            layout,
            catalog,
            cards: SelectorList::parse(".article-card")?,
            image_slots: SelectorList::parse(".article-image, .article-img")?,
            avatars: SelectorList::parse(".author-avatar")?,
        })
    }

    pub fn element(&self) -> ElementId {
        self.grid
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Replace the grid's contents with one card per article.
    pub fn render(
        &self,
        page: &mut Page,
        articles: &[Article],
    ) -> std::result::Result<Vec<ElementId>, DomError> {
        page.clear_children(self.grid)?;
        let cards = articles
            .iter()
            .map(|article| self.build_card(page, article))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.relayout(page)?;
        Ok(cards)
    }

    /// Cards in grid order.
    pub fn cards(&self, page: &Page) -> Vec<ElementId> {
        page.get(self.grid)
            .map(|grid| {
                grid.children()
                    .iter()
                    .copied()
                    .filter(|child| self.cards.matches(page, *child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_card(&self, page: &Page, article_id: u64) -> Option<ElementId> {
        let wanted = article_id.to_string();
        self.cards(page).into_iter().find(|card| {
            page.get(*card)
                .and_then(|element| element.attribute("data-id"))
                == Some(wanted.as_str())
        })
    }

    /// Place shown cards on consecutive grid slots. Hidden cards keep no
    /// slot.
    pub fn relayout(
        &self,
        page: &mut Page,
    ) -> std::result::Result<(), DomError> {
        let shown: Vec<ElementId> = self
            .cards(page)
            .into_iter()
            .filter(|card| page.get(*card).is_some_and(|c| !c.is_hidden()))
            .collect();

        for (slot, card) in shown.into_iter().enumerate() {
            let rect = self.layout.card_rect(slot);
            page.set_rect(card, Some(rect))?;
            for image in page.query_within(card, &self.image_slots) {
                page.set_rect(image, Some(self.layout.image_rect(&rect)))?;
            }
            for avatar in page.query_within(card, &self.avatars) {
                page.set_rect(avatar, Some(self.layout.avatar_rect(&rect)))?;
            }
        }
        Ok(())
    }

    pub fn content_height(&self, page: &Page) -> f32 {
        let shown = self
            .cards(page)
            .into_iter()
            .filter(|card| page.is_rendered(*card))
            .count();
        self.layout.content_height(shown)
    }

    fn cover_source(&self, article: &Article) -> Option<String> {
        article
            .cover_image
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                self.catalog
                    .url_for(&article.content_type)
                    .map(str::to_string)
            })
    }

    fn build_card(
        &self,
        page: &mut Page,
        article: &Article,
    ) -> std::result::Result<ElementId, DomError> {
        let card = page.append(
            self.grid,
            ElementSpec::new("article")
                .class("article-card")
                .attr("data-id", article.id.to_string()),
        )?;

        let image = page
            .append(card, ElementSpec::new("div").class("article-image"))?;
        let mut cover = ElementSpec::new("img")
            .class("article-img")
            .attr(TYPE_ATTRIBUTE, article.content_type.as_str())
            .attr("alt", article.title.clone())
            .attr("loading", "lazy");
        if let Some(source) = self.cover_source(article) {
            cover = cover.attr(SOURCE_ATTRIBUTE, source);
        }
        page.append(image, cover)?;
        page.append(
            image,
            ElementSpec::new("span")
                .class("article-category")
                .attr("data-icon", article.category_icon())
                .text(article.category_label()),
        )?;
        let meta =
            page.append(image, ElementSpec::new("div").class("article-meta"))?;
        page.append(
            meta,
            ElementSpec::new("span")
                .text(format!("{} min read", article.reading_time)),
        )?;
        page.append(
            meta,
            ElementSpec::new("span").text(format!("{} views", article.views)),
        )?;

        let content = page
            .append(card, ElementSpec::new("div").class("article-content"))?;
        let info = page
            .append(content, ElementSpec::new("div").class("article-info"))?;
        page.append(
            info,
            ElementSpec::new("span")
                .text(article.published_at.format("%b %-d, %Y").to_string()),
        )?;
        page.append(
            content,
            ElementSpec::new("h3")
                .class("article-title")
                .text(article.title.clone()),
        )?;
        page.append(
            content,
            ElementSpec::new("p")
                .class("article-excerpt")
                .text(article.excerpt.clone()),
        )?;

        let footer = page
            .append(content, ElementSpec::new("div").class("article-footer"))?;
        self.build_author(page, footer, article)?;
        let stats = page
            .append(footer, ElementSpec::new("div").class("article-stats"))?;
        page.append(
            stats,
            ElementSpec::new("span")
                .class("stat-item")
                .text(article.likes.to_string()),
        )?;
        page.append(
            stats,
            ElementSpec::new("span")
                .class("stat-item")
                .text(article.comments.to_string()),
        )?;

        Ok(card)
    }

    fn build_author(
        &self,
        page: &mut Page,
        footer: ElementId,
        article: &Article,
    ) -> std::result::Result<(), DomError> {
        let author = article.author.clone().unwrap_or_default();
        let name = author.name.unwrap_or_else(|| "Anonymous".to_string());
        let role = author.role.unwrap_or_else(|| "Contributor".to_string());
        let avatar = author
            .avatar
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PORTRAIT_URL.to_string());

        let block = page
            .append(footer, ElementSpec::new("div").class("article-author"))?;
        page.append(
            block,
            ElementSpec::new("img")
                .class("author-avatar")
                .attr(SOURCE_ATTRIBUTE, avatar)
                .attr(TYPE_ATTRIBUTE, ContentType::Portrait.as_str())
                .attr("alt", name.clone()),
        )?;
        let details =
            page.append(block, ElementSpec::new("div").class("author-info"))?;
        page.append(
            details,
            ElementSpec::new("div").class("author-name").text(name),
        )?;
        page.append(
            details,
            ElementSpec::new("div").class("author-role").text(role),
        )?;
        Ok(())
    }
}

/// Article list, its grid, and the loader slot the grid reports to.
///
/// The live loader is looked up on every render, so a render after
/// [`LoaderSlot::disconnect`] builds a fresh one.
#[derive(Debug)]
pub struct BlogView {
    page: SharedPage,
    grid: ArticleGrid,
    slot: Arc<LoaderSlot>,
    filter: CategoryFilter,
    articles: Vec<Article>,
}

impl BlogView {
    pub fn new(
        page: SharedPage,
        slot: Arc<LoaderSlot>,
        layout: GridLayout,
    ) -> Result<Self> {
        let catalog = slot.get_instance(None)?.options().catalog.clone();
        let grid = ArticleGrid::mount(&mut page.write(), layout, catalog)?;
        Ok(Self {
            page,
            grid,
            slot,
            filter: CategoryFilter::new()?,
            articles: Vec::new(),
        })
    }

    pub fn with_articles(mut self, articles: Vec<Article>) -> Self {
        self.articles = articles;
        self
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn grid(&self) -> &ArticleGrid {
        &self.grid
    }

    pub fn slot(&self) -> &Arc<LoaderSlot> {
        &self.slot
    }

    /// The live loader, built with default options if the slot is empty.
    pub fn loader(&self) -> Result<ImageLoadController> {
        self.slot.get_instance(None)
    }

    /// Render every article and re-observe the page.
    pub fn display(&self) -> Result<Vec<ElementId>> {
        let cards = self.grid.render(&mut self.page.write(), &self.articles)?;
        self.loader()?.observe();
        Ok(cards)
    }

    /// Publish a new article at the top of the grid.
    pub fn add_article(&mut self, mut article: Article) -> Result<Vec<ElementId>> {
        article.views = 0;
        article.likes = 0;
        article.comments = 0;
        self.articles.insert(0, article);
        self.display()
    }

    /// Show only cards of `category`. Loading state is untouched; cards that
    /// come back into view keep whatever source they already had.
    pub fn filter_category(&self, category: &str) -> Result<FilterSummary> {
        let mut page = self.page.write();
        let summary = self.filter.apply(&mut page, self.grid.element(), category)?;
        self.grid.relayout(&mut page)?;
        Ok(summary)
    }

    /// Reorder existing cards in place, without re-rendering them.
    pub fn sort(&mut self, order: SortOrder) -> Result<()> {
        order.sort(&mut self.articles);
        let mut page = self.page.write();
        for article in &self.articles {
            if let Some(card) = self.grid.find_card(&page, article.id) {
                page.move_to_end(card)?;
            }
        }
        self.grid.relayout(&mut page)?;
        Ok(())
    }

    pub fn content_height(&self) -> f32 {
        self.grid.content_height(&self.page.read())
    }
}
