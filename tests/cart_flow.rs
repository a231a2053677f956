mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use vector_shop::{
    ingress::ChatEvent,
    models::PayType,
    render::Reply,
    session::Step,
    storage::Storage,
};

#[tokio::test]
async fn running_total_follows_every_change() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "150.00", vec![1.0]).await;
    let add = format!("add_item_to_cart_{id}");

    for _ in 0..3 {
        bot.handle(press(&add, Some(10))).await;
    }
    assert_eq!(bot.cart(CHAT).await.unwrap().amount(), money("450.00"));

    let replies = bot.handle(press(&format!("discount_item_in_cart_{id}"), Some(10))).await;
    assert_eq!(texts(&replies), vec![Step::WaitingDiscount(id).prompt()]);
    let replies = bot.handle(text("10")).await;
    assert!(texts(&replies).contains(&"-45.00"));
    assert!(replies.contains(&Reply::EditControls {
        message_id: 10,
        keyboard: vector_shop::render::line_controls(
            bot.cart(CHAT).await.unwrap().line(id).unwrap()
        ),
    }));
    let cart = bot.cart(CHAT).await.unwrap();
    assert_eq!(cart.amount(), money("405.00"));
    assert_eq!(cart.line(id).unwrap().unit_price, money("135.00"));
    assert_eq!(bot.step(CHAT).await, None);

    bot.handle(press(&format!("edit_count_item_in_cart_{id}"), Some(10))).await;
    let replies = bot.handle(text("+2")).await;
    assert!(texts(&replies).contains(&"+270.00"));
    assert_eq!(bot.cart(CHAT).await.unwrap().amount(), money("675.00"));

    let replies = bot.handle(press(&add, Some(10))).await;
    assert_eq!(texts(&replies)[0], "Stock limit reached: 5");
    assert!(texts(&replies).contains(&"0.00"));
    assert_eq!(bot.cart(CHAT).await.unwrap().amount(), money("675.00"));
}

#[tokio::test]
async fn out_of_range_count_keeps_waiting() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 2, "10", vec![1.0]).await;
    bot.handle(press(&format!("add_item_to_cart_{id}"), Some(3))).await;
    bot.handle(press(&format!("edit_count_item_in_cart_{id}"), Some(3))).await;

    let replies = bot.handle(text("7")).await;

    assert_eq!(
        texts(&replies),
        vec![
            "Quantity must be between 0 and 2.",
            Step::WaitingCartCount(id).prompt(),
        ]
    );
    assert_eq!(bot.step(CHAT).await, Some(Step::WaitingCartCount(id)));
    assert_eq!(bot.cart(CHAT).await.unwrap().amount(), money("10"));
}

#[tokio::test]
async fn removed_line_can_be_added_again() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "3.10", vec![1.0]).await;
    for _ in 0..2 {
        bot.handle(press(&format!("add_item_to_cart_{id}"), Some(4))).await;
    }

    let replies = bot.handle(press(&format!("remove_item_from_cart_{id}"), Some(4))).await;
    assert!(texts(&replies).contains(&"-6.20"));
    assert_eq!(bot.cart(CHAT).await.unwrap().amount(), money("0"));

    bot.handle(press(&format!("add_item_to_cart_{id}"), Some(4))).await;
    let cart = bot.cart(CHAT).await.unwrap();
    assert_eq!(cart.amount(), money("3.10"));
    assert_eq!(cart.line(id).unwrap().count, 1);
}

#[tokio::test]
async fn cart_operations_without_a_cart_fail() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "10", vec![1.0]).await;

    let replies = bot.handle(press(&format!("reduce_item_in_cart_{id}"), None)).await;

    assert_eq!(texts(&replies), vec!["Cart not found."]);
    assert!(bot.cart(CHAT).await.is_none());
}

#[tokio::test]
async fn other_sellers_products_cannot_be_sold() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "10", vec![1.0]).await;

    let replies = bot
        .handle(ChatEvent::Action {
            chat_id: CHAT + 1,
            sender_id: SELLER + 1,
            message_id: None,
            action: format!("add_item_to_cart_{id}").parse().unwrap(),
        })
        .await;

    assert_eq!(texts(&replies), vec!["Product not found."]);
    assert!(bot.cart(CHAT + 1).await.is_none());
}

#[tokio::test]
async fn checkout_commits_and_clears_the_cart() {
    let bot = bot(FakeRecognizer::new());
    let mug = seed_product(&bot, "Mug", 5, "150", vec![1.0]).await;
    let plate = seed_product(&bot, "Plate", 2, "40", vec![0.0]).await;
    bot.handle(press(&format!("add_item_to_cart_{mug}"), Some(1))).await;
    bot.handle(press(&format!("add_item_to_cart_{mug}"), Some(1))).await;
    bot.handle(press(&format!("add_item_to_cart_{plate}"), Some(2))).await;
    bot.handle(press(&format!("discount_item_in_cart_{plate}"), Some(2))).await;
    bot.handle(text("25")).await;

    let replies = bot.handle(text("Checkout")).await;
    assert_eq!(texts(&replies), vec!["Total: 330.00\nChoose the payment type:"]);

    let replies = bot.handle(press("pay_type_kaspi", Some(50))).await;

    assert!(texts(&replies)[0].starts_with("Order #"));
    assert!(bot.cart(CHAT).await.is_none());
    let storage = bot.storage();
    let orders = storage.orders().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].amount, money("330.00"));
    assert_eq!(orders[0].pay_type, PayType::Kaspi);
    assert_eq!(orders[0].buyer_id, SELLER);

    let details = storage.order_details().unwrap();
    assert_eq!(details.len(), 2);
    let plate_line = details.iter().find(|d| d.product_id == plate).unwrap();
    assert_eq!(plate_line.discount, 25);
    assert_eq!(plate_line.unit_amount, money("30.00"));
    assert_eq!(plate_line.fact_sum, money("30.00"));

    assert_eq!(storage.product_by_id(mug).await.unwrap().count, 3);
    assert_eq!(storage.product_by_id(plate).await.unwrap().count, 1);

    let audits = storage.audits().unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "order_committed");
    assert_eq!(audits[0].owner_id, Some(SELLER));
}

#[tokio::test]
async fn stock_conflict_commits_nothing_and_keeps_the_cart() {
    let bot = bot(FakeRecognizer::new());
    let a = seed_product(&bot, "A", 5, "10", vec![1.0]).await;
    let b = seed_product(&bot, "B", 5, "20", vec![2.0]).await;
    let c = seed_product(&bot, "C", 5, "30", vec![3.0]).await;
    for id in [a, b, c] {
        bot.handle(press(&format!("add_item_to_cart_{id}"), None)).await;
    }
    // someone else sold the last B in the meantime
    bot.storage().set_stock(b, 0).unwrap();

    let replies = bot.handle(press("pay_type_cash", None)).await;

    let shown = texts(&replies);
    assert_eq!(
        shown[0],
        "Not enough stock to complete the order. Adjust quantities and try again."
    );
    assert!(shown.contains(&"B in stock: 0"));
    assert!(shown.contains(&"-20.00"));
    let storage = bot.storage();
    assert!(storage.orders().unwrap().is_empty());
    assert!(storage.order_details().unwrap().is_empty());
    assert_eq!(storage.product_by_id(a).await.unwrap().count, 5);
    assert_eq!(storage.product_by_id(c).await.unwrap().count, 5);

    let cart = bot.cart(CHAT).await.unwrap();
    assert_eq!(cart.line(b).unwrap().store_count, 0);
    assert_eq!(cart.line(b).unwrap().count, 0);
    assert_eq!(cart.amount(), money("40"));

    let replies = bot.handle(press("pay_type_cash", None)).await;
    assert!(texts(&replies)[0].starts_with("Order #"));
    assert_eq!(storage.product_by_id(b).await.unwrap().count, 0);
}

#[tokio::test]
async fn slow_audit_does_not_undo_a_committed_order() {
    let bot = bot_with(
        FlakyStorage::slow_audit(Duration::from_millis(300)),
        FakeRecognizer::new(),
    );
    let id = seed_product(&bot, "Mug", 3, "20", vec![1.0]).await;
    bot.handle(press(&format!("add_item_to_cart_{id}"), None)).await;

    let replies = bot.handle(press("pay_type_cash", None)).await;

    assert!(texts(&replies)[0].starts_with("Order #"), "got {replies:?}");
    assert!(bot.cart(CHAT).await.is_none());

    let replies = bot.handle(press("pay_type_cash", None)).await;
    assert_eq!(texts(&replies), vec!["Cart not found."]);
    let storage = &bot.storage().inner;
    assert_eq!(storage.orders().unwrap().len(), 1);
    assert_eq!(storage.product_by_id(id).await.unwrap().count, 2);
}

#[tokio::test]
async fn out_of_stock_product_does_not_open_a_cart() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 0, "20", vec![1.0]).await;

    let replies = bot.handle(press(&format!("add_item_to_cart_{id}"), None)).await;

    assert_eq!(texts(&replies), vec!["Stock limit reached: 0"]);
    assert!(bot.cart(CHAT).await.is_none());
}

#[tokio::test]
async fn empty_cart_is_not_checked_out() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "10", vec![1.0]).await;
    bot.handle(press(&format!("add_item_to_cart_{id}"), None)).await;
    bot.handle(press(&format!("reduce_item_in_cart_{id}"), None)).await;

    let replies = bot.handle(text("Checkout")).await;

    assert_eq!(texts(&replies), vec!["Cart is empty."]);
    assert!(bot.storage().orders().unwrap().is_empty());
}

#[tokio::test]
async fn cancel_drops_the_cart() {
    let bot = bot(FakeRecognizer::new());
    let id = seed_product(&bot, "Mug", 5, "10", vec![1.0]).await;
    bot.handle(press(&format!("add_item_to_cart_{id}"), None)).await;

    let replies = bot.handle(text("Cancel")).await;

    assert_eq!(texts(&replies), vec!["Sale cancelled."]);
    assert!(bot.cart(CHAT).await.is_none());
    assert_eq!(bot.storage().product_by_id(id).await.unwrap().count, 5);
}

#[tokio::test]
async fn concurrent_adds_on_one_chat_are_serialized() {
    let bot = Arc::new(bot(FakeRecognizer::new()));
    let id = seed_product(&*bot, "Mug", 100, "2.50", vec![1.0]).await;

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let bot = Arc::clone(&bot);
            let event = press(&format!("add_item_to_cart_{id}"), None);
            tokio::spawn(async move { bot.handle(event).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let cart = bot.cart(CHAT).await.unwrap();
    assert_eq!(cart.line(id).unwrap().count, 40);
    assert_eq!(cart.amount(), money("100.00"));
}
