use crate::cli::SearchArgs;
use crate::context::ClientContext;
use gsr_common::pagination::ShowingRange;

pub async fn handle(args: &SearchArgs, ctx: &ClientContext) -> anyhow::Result<()> {
    let page = ctx.gateway.list_papers(&args.query_pairs()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if let Some(error) = &page.error {
        anyhow::bail!("{error}");
    }

    let pagination = page.pagination;
    println!(
        "{}",
        ShowingRange::new(pagination.page, pagination.limit, pagination.total)
    );
    for paper in &page.data {
        println!();
        println!("{}  {}", paper.id, paper.title);
        println!("    {}", paper.author_line());
        println!(
            "    {} | {} | {} | {} | {}",
            paper.country.label(),
            paper.subject.label(),
            paper.level.label(),
            paper.paper_type.label(),
            paper.submitted.format("%Y-%m-%d")
        );
    }
    if pagination.total_pages > 1 {
        println!();
        println!("Page {} of {}", pagination.page, pagination.total_pages);
    }

    Ok(())
}
